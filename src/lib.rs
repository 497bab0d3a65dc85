//! NOVA audio toolkit library.
//!
//! This library provides the pieces behind the `nova` binary:
//!
//! - `pipe` - Named-pipe client for Audacity's mod-script-pipe
//! - `models` - Script command and effect types
//! - `editor` - Batch sequencer issuing ordered edits through the pipe
//! - `launcher` - Finding or starting the Audacity process
//! - `scenario` - JSON scenario files describing one batch job
//! - `cli` - Argument parsing for the binary
//!
//! # Pipe Module
//!
//! ```ignore
//! use nova::pipe::{PipeClient, PipeProfile};
//!
//! let mut client = PipeClient::new(PipeProfile::detect()?);
//! let reply = client.session(|client| client.do_command("Select: Start=0 End=0 Track=1"))?;
//! ```

pub mod cli;
pub mod editor;
pub mod launcher;
pub mod models;
pub mod pipe;
pub mod scenario;
