//! Line framing for the scripting pipes.
//!
//! # Wire Format
//!
//! Outbound, a single line followed by the platform EOL:
//!
//! ```text
//! <Verb>: <Key>=<Value> ...<eol>
//! ```
//!
//! Inbound, any number of lines followed by an empty line:
//!
//! ```text
//! <line>\n
//! <line>\n
//! \n
//! ```
//!
//! CRLF line endings on the read side are folded to LF before the terminator
//! check, so responses from a Windows peer frame the same way.

use std::io::{BufRead, Write};

use crate::pipe::client::PipeError;

/// The line that closes a response once at least one content line was seen.
pub const RESPONSE_TERMINATOR: &str = "\n";

/// Write one command followed by `eol`, then flush.
///
/// The command and its terminator go out in a single `write_all` so the peer
/// never sees a half-terminated line.
///
/// # Errors
///
/// Returns `PipeError::Io` if the write or flush fails.
pub fn write_command<W: Write>(writer: &mut W, command: &str, eol: &str) -> Result<(), PipeError> {
    let mut line = String::with_capacity(command.len() + eol.len());
    line.push_str(command);
    line.push_str(eol);

    writer.write_all(line.as_bytes())?;
    writer.flush()?;

    Ok(())
}

/// Read one response, blocking until its terminator arrives.
///
/// # Protocol
///
/// 1. Read a line (up to and including `\n`)
/// 2. A line equal to `terminator` before any content is skipped
/// 3. A line equal to `terminator` after content ends the response
/// 4. Anything else, whitespace-only lines included, is part of the body
///
/// The body is returned with surrounding whitespace trimmed.
///
/// # Errors
///
/// Returns an error if:
/// - The peer closes the channel before the terminator (`PeerClosed`)
/// - A line is not valid UTF-8 (`MalformedResponse`)
/// - The underlying read fails (`Io`)
///
/// There is no timeout: a peer that never terminates the response blocks the
/// caller indefinitely.
pub fn read_response<R: BufRead>(reader: &mut R, terminator: &str) -> Result<String, PipeError> {
    let mut body = String::new();
    let mut has_content = false;
    let mut raw = Vec::new();

    loop {
        raw.clear();
        let bytes_read = reader.read_until(b'\n', &mut raw)?;

        // EOF: the editor closed its end before the terminator
        if bytes_read == 0 {
            return Err(PipeError::PeerClosed);
        }

        let line = std::str::from_utf8(&raw)
            .map_err(|e| PipeError::MalformedResponse(format!("invalid UTF-8: {}", e)))?;
        let line = fold_crlf(line);

        // A blank line only terminates once something was read
        if line == terminator {
            if has_content {
                break;
            }
            continue;
        }

        has_content = true;
        body.push_str(&line);
    }

    Ok(body.trim().to_string())
}

fn fold_crlf(line: &str) -> std::borrow::Cow<'_, str> {
    match line.strip_suffix("\r\n") {
        Some(stripped) => format!("{}\n", stripped).into(),
        None => line.into(),
    }
}
