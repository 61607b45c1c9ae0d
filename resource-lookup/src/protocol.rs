//! Wire format of the lookup protocol.
//!
//! A request is the raw resource name, one datagram per request. A response
//! is UTF-8 text framed by marker lines:
//!
//! ```text
//! -BEGIN-          -ERROR-
//! <value>          <explanation>
//! -END-            -END-
//! ```

use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

pub const BEGIN_MARKER: &str = "-BEGIN-";
pub const ERROR_MARKER: &str = "-ERROR-";
pub const END_MARKER: &str = "-END-";

/// Sent when the response text itself cannot be built. Kept static so the
/// fallback needs no allocation.
pub const INTERNAL_ERROR_RESPONSE: &str = "-ERROR-\nInternal server error.\n-END-";

/// Every way a request can fail. `Display` renders exactly the explanation
/// placed inside an `-ERROR-` frame.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Transport(#[from] io::Error),
    #[error("Received zero bytes.")]
    EmptyRequest,
    #[error("Received resource name size is more than {limit} bytes.")]
    NameTooLong { limit: usize },
    #[error("No such resource name")]
    ResourceNotFound,
    #[error("Resource info is more than {limit} bytes.")]
    ResponseTooLarge { limit: usize },
    /// The response buffer could not be allocated. The cause is logged,
    /// never sent.
    #[error("Internal server error.")]
    Formatting(#[from] TryReserveError),
}

/// Length of the frame around `body`, without building it.
pub fn framed_len(marker: &str, body: &str) -> usize {
    marker.len() + body.len() + END_MARKER.len() + 2
}

pub fn frame_value(value: &str) -> Result<String, TryReserveError> {
    frame(BEGIN_MARKER, value)
}

pub fn frame_error(explanation: &str) -> Result<String, TryReserveError> {
    frame(ERROR_MARKER, explanation)
}

fn frame(marker: &str, body: &str) -> Result<String, TryReserveError> {
    let mut text = String::new();
    text.try_reserve_exact(framed_len(marker, body))?;
    text.push_str(marker);
    text.push('\n');
    text.push_str(body);
    text.push('\n');
    text.push_str(END_MARKER);
    Ok(text)
}
