use std::borrow::Cow;
use std::io;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Limits;
use crate::protocol::{
    BEGIN_MARKER, INTERNAL_ERROR_RESPONSE, RequestError, frame_error, frame_value, framed_len,
};
use crate::sender::SendLane;
use crate::session::{Reply, Session};
use crate::table::ResourceTable;

/// Turns received bytes into a framed response. Cheap to clone; every
/// processing task gets its own handle to the shared table.
#[derive(Clone, Debug)]
pub struct Processor {
    table: Arc<ResourceTable>,
    limits: Limits,
}

impl Processor {
    pub fn new(table: Arc<ResourceTable>, limits: Limits) -> Self {
        Self { table, limits }
    }

    /// Classifies a completed receive. The first failing check wins:
    /// transport error, empty payload, oversized name, unknown name, then
    /// a value too large to fit in one response.
    pub fn lookup(&self, received: io::Result<Vec<u8>>) -> Result<&str, RequestError> {
        let name = received?;
        if name.is_empty() {
            return Err(RequestError::EmptyRequest);
        }
        if name.len() > self.limits.max_name_len {
            return Err(RequestError::NameTooLong {
                limit: self.limits.max_name_len,
            });
        }

        let value = self
            .table
            .get(&name)
            .ok_or(RequestError::ResourceNotFound)?;

        if framed_len(BEGIN_MARKER, value) > self.limits.max_response_len {
            return Err(RequestError::ResponseTooLarge {
                limit: self.limits.max_response_len,
            });
        }
        Ok(value)
    }

    pub fn respond(&self, received: io::Result<Vec<u8>>) -> Cow<'static, str> {
        let framed = match self.lookup(received) {
            Ok(value) => frame_value(value),
            Err(err) => {
                debug!(error = %err, "request rejected");
                frame_error(&err.to_string())
            }
        };

        match framed {
            Ok(text) => Cow::Owned(text),
            Err(error) => internal_error(RequestError::Formatting(error)),
        }
    }

    pub fn process(&self, session: Session) -> Reply {
        session.respond(|received| self.respond(received))
    }

    /// Processes `session` on the worker pool and queues the reply on `lane`.
    pub fn spawn(&self, session: Session, lane: SendLane) -> JoinHandle<()> {
        let processor = self.clone();
        tokio::spawn(async move {
            let reply = processor.process(session);
            lane.enqueue(reply);
        })
    }
}

/// Static reply for a request whose response could not be built.
fn internal_error(error: RequestError) -> Cow<'static, str> {
    warn!(?error, "could not build response; sending internal error");
    Cow::Borrowed(INTERNAL_ERROR_RESPONSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> Processor {
        let table = ResourceTable::from_entries([
            ("cpu".to_string(), "4 cores".to_string()),
            ("ram".to_string(), "16GB".to_string()),
            ("fits".to_string(), "f".repeat(1024 - 14)),
            ("huge".to_string(), "h".repeat(1024 - 13)),
        ])
        .expect("non-empty table");
        Processor::new(Arc::new(table), Limits::default())
    }

    #[test]
    fn known_name_returns_value_frame() {
        assert_eq!(
            processor().respond(Ok(b"cpu".to_vec())),
            "-BEGIN-\n4 cores\n-END-"
        );
    }

    #[test]
    fn unknown_name_is_reported() {
        assert_eq!(
            processor().respond(Ok(b"gpu".to_vec())),
            "-ERROR-\nNo such resource name\n-END-"
        );
    }

    #[test]
    fn empty_request_is_reported() {
        assert_eq!(
            processor().respond(Ok(Vec::new())),
            "-ERROR-\nReceived zero bytes.\n-END-"
        );
    }

    #[test]
    fn name_length_boundary() {
        let processor = processor();
        assert!(matches!(
            processor.lookup(Ok(vec![b'a'; 64])),
            Err(RequestError::ResourceNotFound)
        ));
        assert_eq!(
            processor.respond(Ok(vec![b'a'; 65])),
            "-ERROR-\nReceived resource name size is more than 64 bytes.\n-END-"
        );
    }

    #[test]
    fn oversized_payload_is_never_looked_up() {
        let mut payload = b"cpu".to_vec();
        payload.extend(std::iter::repeat_n(b' ', 62));
        assert!(matches!(
            processor().lookup(Ok(payload)),
            Err(RequestError::NameTooLong { limit: 64 })
        ));
    }

    #[test]
    fn response_size_boundary() {
        let processor = processor();
        let fits = processor.respond(Ok(b"fits".to_vec()));
        assert_eq!(fits.len(), 1024);
        assert!(fits.starts_with("-BEGIN-\n"));

        assert_eq!(
            processor.respond(Ok(b"huge".to_vec())),
            "-ERROR-\nResource info is more than 1024 bytes.\n-END-"
        );
    }

    #[test]
    fn transport_error_carries_its_message() {
        let error = io::Error::new(io::ErrorKind::ConnectionReset, "peer reset the port");
        assert_eq!(
            processor().respond(Err(error)),
            "-ERROR-\npeer reset the port\n-END-"
        );
    }

    #[test]
    fn configured_limits_drive_the_messages() {
        let table = ResourceTable::from_entries([("cpu", "4 cores")]).unwrap();
        let limits = Limits::new(2, 16, 32).unwrap();
        let processor = Processor::new(Arc::new(table), limits);

        assert_eq!(
            processor.respond(Ok(b"cpu".to_vec())),
            "-ERROR-\nReceived resource name size is more than 2 bytes.\n-END-"
        );

        let table = ResourceTable::from_entries([("cpu", "4 cores")]).unwrap();
        let processor = Processor::new(Arc::new(table), Limits::new(8, 16, 32).unwrap());
        assert_eq!(
            processor.respond(Ok(b"cpu".to_vec())),
            "-ERROR-\nResource info is more than 16 bytes.\n-END-"
        );
    }

    #[test]
    fn repeated_lookups_are_identical() {
        let processor = processor();
        let first = processor.respond(Ok(b"ram".to_vec()));
        let second = processor.respond(Ok(b"ram".to_vec()));
        assert_eq!(first, second);
        assert_eq!(first, "-BEGIN-\n16GB\n-END-");
    }

    #[test]
    fn allocation_failure_falls_back_to_internal_error() {
        let cause = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let error = RequestError::from(cause);
        assert_eq!(error.to_string(), "Internal server error.");
        assert_eq!(internal_error(error), INTERNAL_ERROR_RESPONSE);
    }
}
