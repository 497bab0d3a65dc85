//! Named-pipe client for Audacity's `mod-script-pipe` scripting interface.
//!
//! Audacity exposes two one-way channels when the scripting module is enabled:
//! one we write commands into, one we read responses from.
//!
//! ```text
//! ┌─────────────────┐      to-pipe (commands)      ┌─────────────────────┐
//! │      nova       │ ───────────────────────────► │      Audacity       │
//! │  (PipeClient)   │ ◄─────────────────────────── │  (mod-script-pipe)  │
//! └─────────────────┘    from-pipe (responses)     └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! One command per line, terminated by the platform EOL (`\r\n\0` on Windows,
//! `\n` elsewhere):
//!
//! ```text
//! Select: Start=0 End=0 Track=1
//! ```
//!
//! The response is zero or more lines followed by an empty line:
//!
//! ```text
//! BatchCommand finished: OK\n
//! \n
//! ```
//!
//! The protocol is strictly request/response and carries no request IDs, so
//! every `write` must be paired with exactly one `read` by the caller.
//!
//! # Usage
//!
//! ```ignore
//! use nova::pipe::{PipeClient, PipeProfile};
//!
//! let mut client = PipeClient::new(PipeProfile::detect()?);
//! let reply = client.session(|client| client.do_command("SelectAll"))?;
//! ```

mod client;
mod framing;
mod profile;

pub use client::{PipeClient, PipeError, ScriptTransport, DEFAULT_COMMAND_DELAY};
pub use framing::{read_response, write_command, RESPONSE_TERMINATOR};
pub use profile::{current_uid, LaunchCommand, PipeProfile, ENV_PIPE_FROM, ENV_PIPE_TO};
