//! Response framing
//!
//! The program under test prints its prompt before reading every line, so
//! the stream looks like:
//! ```text
//! db > Executed\n
//! db > (1, user1, person1@example.com)\n
//! db > <end of stream after .exit>
//! ```
//! One chunk runs from the prompt that preceded a command up to (but not
//! including) the next prompt, or to end of stream.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::common::{Error, Result};

/// Size of a single read from the program's stdout
const READ_SIZE: usize = 4096;

/// One framed response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Raw text, leading prompt included
    pub text: String,
    /// The stream ended instead of showing the next prompt
    pub eof: bool,
}

impl Chunk {
    /// Captured output for this chunk
    ///
    /// The line terminator in front of the next prompt belongs to the
    /// framing, so exactly one trailing `\n` (or `\r\n`) is dropped.
    pub fn into_captured(self) -> String {
        let mut text = self.text;
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        text
    }
}

/// Position where the next prompt starts, if the buffer holds a full chunk
///
/// Only the end of the buffer is checked, so prompt text inside a response
/// body is kept. A body that itself ends with the prompt text at the end of
/// a read is split there; custom prompts should not be valid response text.
fn boundary(buf: &[u8], prompt: &[u8]) -> Option<usize> {
    if prompt.is_empty() {
        return None;
    }

    let body_start = if buf.starts_with(prompt) {
        prompt.len()
    } else {
        0
    };

    if buf.len() >= body_start + prompt.len() && buf.ends_with(prompt) {
        Some(buf.len() - prompt.len())
    } else {
        None
    }
}

/// Read one chunk from the stream
///
/// `pending` carries bytes read past the previous chunk (normally the
/// prompt for the command just sent) and keeps the next prompt on return.
pub async fn read_chunk<R: AsyncRead + Unpin>(
    reader: &mut R,
    pending: &mut Vec<u8>,
    prompt: &[u8],
) -> Result<Chunk> {
    let mut scratch = [0u8; READ_SIZE];

    loop {
        if let Some(end) = boundary(pending, prompt) {
            let next_prompt = pending.split_off(end);
            let chunk = std::mem::replace(pending, next_prompt);
            return Ok(Chunk {
                text: String::from_utf8_lossy(&chunk).into_owned(),
                eof: false,
            });
        }

        let bytes_read = reader.read(&mut scratch).await.map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                Error::Communication("Program output stream closed".to_string())
            } else {
                Error::Communication(format!("Failed to read program output: {}", e))
            }
        })?;

        if bytes_read == 0 {
            let chunk = std::mem::take(pending);
            return Ok(Chunk {
                text: String::from_utf8_lossy(&chunk).into_owned(),
                eof: true,
            });
        }

        pending.extend_from_slice(&scratch[..bytes_read]);
    }
}
