//! Buffer error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur while attaching or growing a buffer.
///
/// Every variant is recoverable: a failed operation leaves the buffer
/// exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufError {
    /// The caller-supplied region cannot hold the header plus one element.
    InsufficientBuffer {
        /// Length of the supplied region in bytes.
        provided: usize,
        /// Minimum length required in bytes.
        required: usize,
    },
    /// The allocator refused a heap request.
    AllocationFailed {
        /// Size of the refused request in bytes.
        requested_bytes: usize,
    },
    /// The requested element count cannot be expressed as an allocation.
    CapacityOverflow {
        /// Element count that was requested.
        requested: usize,
    },
}

impl fmt::Display for BufError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBuffer { provided, required } => {
                write!(
                    f,
                    "insufficient buffer: provided {provided} bytes, need at least {required} bytes"
                )
            }
            Self::AllocationFailed { requested_bytes } => {
                write!(f, "allocation of {requested_bytes} bytes failed")
            }
            Self::CapacityOverflow { requested } => {
                write!(f, "capacity overflow: {requested} elements")
            }
        }
    }
}

impl Error for BufError {}

/// A consuming operation that failed, handing back the untouched buffer.
///
/// Returned by [`GrowBuf::reserved`](crate::GrowBuf::reserved) and
/// [`GrowBuf::shrunk`](crate::GrowBuf::shrunk).
pub struct GrowFailure<B> {
    buf: B,
    error: BufError,
}

impl<B> GrowFailure<B> {
    pub(crate) fn new(buf: B, error: BufError) -> Self {
        Self { buf, error }
    }

    /// The reason the operation failed.
    pub fn error(&self) -> &BufError {
        &self.error
    }

    /// Recover the original buffer, unchanged by the failed call.
    pub fn into_inner(self) -> B {
        self.buf
    }

    /// Split into the original buffer and the error.
    pub fn into_parts(self) -> (B, BufError) {
        (self.buf, self.error)
    }
}

impl<B> fmt::Debug for GrowFailure<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowFailure")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<B> fmt::Display for GrowFailure<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<B> Error for GrowFailure<B> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl<B> From<GrowFailure<B>> for BufError {
    fn from(failure: GrowFailure<B>) -> Self {
        failure.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_buffer_message_names_both_sizes() {
        let err = BufError::InsufficientBuffer {
            provided: 8,
            required: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient buffer: provided 8 bytes, need at least 20 bytes"
        );
    }

    #[test]
    fn allocation_failed_message() {
        let err = BufError::AllocationFailed {
            requested_bytes: 184,
        };
        assert_eq!(err.to_string(), "allocation of 184 bytes failed");
    }

    #[test]
    fn failure_returns_buffer_and_error() {
        let failure = GrowFailure::new(
            vec![1, 2, 3],
            BufError::CapacityOverflow { requested: 7 },
        );
        assert_eq!(failure.error(), &BufError::CapacityOverflow { requested: 7 });
        assert_eq!(failure.to_string(), "capacity overflow: 7 elements");
        let (buf, err) = failure.into_parts();
        assert_eq!(buf, vec![1, 2, 3]);
        assert!(matches!(err, BufError::CapacityOverflow { .. }));
    }

    #[test]
    fn failure_source_is_the_buf_error() {
        let failure = GrowFailure::new((), BufError::AllocationFailed { requested_bytes: 4 });
        let source = failure.source().map(|e| e.to_string());
        assert_eq!(source.as_deref(), Some("allocation of 4 bytes failed"));
    }
}
