//! Error taxonomy and retry classification
//!
//! Every failure raised by the stack is one of five kinds: `Connection`
//! (transport-level), `Protocol` (framing/checksum/layout violations),
//! `Device` (command rejected or malformed device behavior), `Configuration`
//! (caller-supplied invalid parameters, rejected before any byte leaves the
//! process) and `Timeout` (no correlated reply within the deadline).
//!
//! Each kind carries a recoverability verdict and maps to a concrete
//! [`RetryStrategy`] so callers never have to pattern-match error text to
//! decide what to do next.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Connection error codes the stack treats as permanently fatal.
pub mod fatal {
    /// The surrounding application lost its transport permission for good.
    pub const PERMISSION_DENIED: u16 = 0x0001;
    /// The device firmware does not speak this protocol revision.
    pub const UNSUPPORTED_FIRMWARE: u16 = 0x0002;
}

const FATAL_CONNECTION_CODES: &[u16] = &[fatal::PERMISSION_DENIED, fatal::UNSUPPORTED_FIRMWARE];

/// Number of timeout retries before the operation is abandoned.
pub const MAX_TIMEOUT_ATTEMPTS: u32 = 3;

/// Main error type for the protocol stack
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failures (send rejected, link dropped, disposal)
    #[error("connection error: {message}")]
    Connection {
        message: String,
        code: Option<u16>,
    },

    /// Framing, checksum and payload-layout violations
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        /// Expected checksum, when the failure is a checksum mismatch
        expected: Option<(u8, u8)>,
        /// Checksum found on the wire
        actual: Option<(u8, u8)>,
    },

    /// The device rejected a command or behaved out of contract
    #[error("device error: {message}")]
    Device {
        message: String,
        /// Message ID of the rejected command, when known
        code: Option<u8>,
    },

    /// Caller-supplied parameters failed validation before any I/O
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<&'static str>,
    },

    /// No correlated reply arrived within the deadline
    #[error("timeout: {operation} exceeded {timeout_ms}ms (attempt {attempts})")]
    Timeout {
        operation: String,
        timeout_ms: u64,
        attempts: u32,
    },
}

/// What a caller should do with a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Reconnect the transport with exponential backoff, no attempt cap
    ReconnectBackoff { base: Duration },
    /// Retry after a short fixed delay
    FixedDelay { delay: Duration, max_attempts: u32 },
    /// Power-cycle the device once, then give up
    ResetDevice,
    /// Retry with exponential backoff up to a hard attempt cap
    RetryBackoff { base: Duration, max_attempts: u32 },
    /// Drop the operation silently
    Ignore,
    /// Not retriable; the caller must supply corrected input
    None,
}

impl Error {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            code: None,
        }
    }

    /// Create a connection error with a transport error code
    pub fn connection_with_code(message: impl Into<String>, code: u16) -> Self {
        Self::Connection {
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Create a checksum-mismatch protocol error
    pub fn checksum_mismatch(expected: (u8, u8), actual: (u8, u8)) -> Self {
        Self::Protocol {
            message: format!(
                "checksum mismatch: expected {:02X} {:02X}, got {:02X} {:02X}",
                expected.0, expected.1, actual.0, actual.1
            ),
            expected: Some(expected),
            actual: Some(actual),
        }
    }

    /// Create a device error
    pub fn device(message: impl Into<String>, code: Option<u8>) -> Self {
        Self::Device {
            message: message.into(),
            code,
        }
    }

    /// Create a configuration error for a named field
    pub fn configuration(message: impl Into<String>, field: Option<&'static str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration, attempts: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
            attempts,
        }
    }

    /// Whether retrying this failure can possibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Connection { code, .. } => {
                !code.is_some_and(|c| FATAL_CONNECTION_CODES.contains(&c))
            }
            Error::Protocol { .. } => true,
            Error::Device { .. } => false,
            Error::Configuration { .. } => false,
            Error::Timeout { attempts, .. } => *attempts < MAX_TIMEOUT_ATTEMPTS,
        }
    }

    /// Map this failure to the retry strategy callers should apply.
    pub fn retry_strategy(&self) -> RetryStrategy {
        match self {
            Error::Connection { .. } if self.is_recoverable() => RetryStrategy::ReconnectBackoff {
                base: Duration::from_millis(500),
            },
            Error::Connection { .. } => RetryStrategy::None,
            Error::Protocol { .. } => RetryStrategy::FixedDelay {
                delay: Duration::from_millis(100),
                max_attempts: 2,
            },
            Error::Device { .. } => RetryStrategy::ResetDevice,
            Error::Configuration { .. } => RetryStrategy::None,
            Error::Timeout { attempts, .. } if *attempts < MAX_TIMEOUT_ATTEMPTS => {
                RetryStrategy::RetryBackoff {
                    base: Duration::from_millis(250),
                    max_attempts: MAX_TIMEOUT_ATTEMPTS,
                }
            }
            Error::Timeout { .. } => RetryStrategy::Ignore,
        }
    }

    /// Error category for log fields and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Connection { .. } => "connection",
            Error::Protocol { .. } => "protocol",
            Error::Device { .. } => "device",
            Error::Configuration { .. } => "configuration",
            Error::Timeout { .. } => "timeout",
        }
    }
}
