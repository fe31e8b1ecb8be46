//! Error types for the Modbus master engine.
//!
//! This module defines the single error taxonomy used throughout the
//! crate, distinguishing caller mistakes, transport faults, and protocol
//! exceptions reported by the slave device.

use thiserror::Error;

use crate::types::ExceptionCode;

/// Primary error type for the Modbus engine.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Underlying transport I/O failure (open/read/write refused by the OS).
    #[error("transport error: {0}")]
    TransportError(#[from] std::io::Error),

    /// Caller supplied a value of the wrong shape, e.g. a string longer
    /// than the register span allows, or a bit vector of the wrong length.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was wrong.
        message: String,
    },

    /// Caller supplied a value outside its documented domain (e.g. a
    /// register count above the function code's limit).
    #[error("value out of range: {message} (value: {value})")]
    ValueOutOfRange {
        /// Description of the violated constraint.
        message: String,
        /// The offending value, rendered for diagnostics.
        value: i64,
    },

    /// Zero bytes were received within the read timeout.
    #[error("no response received within timeout")]
    NoResponse,

    /// Fewer than the expected number of bytes were received before timeout.
    #[error("short response: expected {expected} bytes, got {actual}")]
    ShortResponse {
        /// Number of bytes the Framer predicted for this exchange.
        expected: usize,
        /// Number of bytes actually received.
        actual: usize,
    },

    /// Bytes were received, but framing, address, function code, or byte
    /// count validation failed.
    #[error("invalid response: {message}")]
    InvalidResponse {
        /// Description of the validation failure.
        message: String,
        /// The raw bytes received, for diagnostics.
        bytes: Vec<u8>,
    },

    /// CRC (RTU) or LRC (ASCII) validation failed.
    #[error("checksum mismatch: expected {expected:02X?}, got {actual:02X?}")]
    ChecksumMismatch {
        /// Checksum bytes computed locally.
        expected: Vec<u8>,
        /// Checksum bytes found in the received frame.
        actual: Vec<u8>,
    },

    /// The bytes echoed back by the bus did not match the transmitted request.
    #[error("local echo mismatch: sent {sent:02X?}, echoed {echoed:02X?}")]
    LocalEchoMismatch {
        /// Bytes that were transmitted.
        sent: Vec<u8>,
        /// Bytes that were read back as the echo.
        echoed: Vec<u8>,
    },

    /// The slave reported a protocol exception (function code with the
    /// high bit set).
    #[error("slave exception: {code:?}")]
    SlaveException {
        /// The exception code reported by the slave.
        code: ExceptionCode,
    },
}

/// Result type alias for Modbus operations.
pub type Result<T> = std::result::Result<T, ModbusError>;

impl ModbusError {
    /// Build an [`ModbusError::InvalidArgument`] from a displayable message.
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        ModbusError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Build a [`ModbusError::ValueOutOfRange`] from a message and value.
    pub(crate) fn out_of_range(message: impl Into<String>, value: i64) -> Self {
        ModbusError::ValueOutOfRange {
            message: message.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModbusError::ShortResponse {
            expected: 8,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('8'));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_slave_exception_display() {
        let err = ModbusError::SlaveException {
            code: ExceptionCode::IllegalDataAddress,
        };
        assert!(err.to_string().contains("IllegalDataAddress"));
    }

    #[test]
    fn test_transport_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err: ModbusError = io_err.into();
        assert!(matches!(err, ModbusError::TransportError(_)));
    }
}
