//! Master-side Modbus RTU/ASCII serial-line protocol engine.
//!
//! This crate drives a point-to-point or multi-drop Modbus serial bus on
//! which one master issues requests to addressed slaves and interprets
//! their responses. It owns request/response framing and validation for
//! every implemented function code, the inter-frame silent interval the
//! standard mandates, typed encoding/decoding of the domain-level values
//! application code actually deals with, and an error taxonomy that
//! distinguishes caller mistakes, transport faults, and protocol
//! exceptions reported by the slave.
//!
//! # Scope
//!
//! Implemented function codes: read coils (1), read discrete inputs (2),
//! read holding registers (3), read input registers (4), write single
//! coil (5), write single register (6), write multiple coils (15), write
//! multiple registers (16). Modbus TCP, function code 23, 32-bit
//! ("Enron") register addressing, and multi-byte slave addresses are out
//! of scope.
//!
//! Serial port I/O itself is delegated to an implementation of the
//! [`transport::Transport`] trait; [`transport::SerialTransport`] is the
//! default, backed by the `serialport` crate. Tests and embedding
//! applications that want to script an exchange without real hardware can
//! implement the trait directly, or use [`transport::ScriptedTransport`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use modbus_serial_master::{Instrument, InstrumentSettings, SerialSettings, FunctionCode};
//!
//! # fn main() -> modbus_serial_master::Result<()> {
//! let instrument = Instrument::open(
//!     "/dev/ttyUSB0",
//!     1, // slave address
//!     SerialSettings::new(9600),
//!     InstrumentSettings::new(),
//! );
//!
//! let voltage = instrument.read_register_scaled(5, 1, FunctionCode::ReadHoldingRegisters)?;
//! instrument.write_register(4097, 3258)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Sharing a bus across slaves
//!
//! Several [`Instrument`]s can address different slaves on the same
//! physical line by sharing one [`engine::TransactionEngine`], which
//! serializes access to the underlying [`transport::Transport`] behind a
//! mutex (only one outstanding request per transport at a time, per the
//! half-duplex, stop-and-wait nature of the protocol).
//!
//! ```rust,no_run
//! use modbus_serial_master::{
//!     Instrument, InstrumentSettings, SerialSettings, SerialTransport, TransactionEngine,
//! };
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0");
//! let engine = TransactionEngine::new(transport, SerialSettings::new(9600), InstrumentSettings::new());
//! let pump = Instrument::with_engine(engine, 1);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

pub mod codec;
pub mod crc;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod framer;
pub mod instrument;
pub mod transport;
pub mod types;

pub use diagnostics::{
    ExchangeOutcome, ExchangeRecord, HumanTraceFormatter, JsonTraceFormatter, TraceFormatter,
};
pub use engine::TransactionEngine;
pub use error::{ModbusError, Result};
pub use instrument::Instrument;
pub use transport::{ScriptedTransport, SerialTransport, Transport};
pub use types::{
    ByteOrder, ExceptionCode, FramingMode, FunctionCode, InstrumentSettings, Parity,
    SerialSettings, BROADCAST_ADDRESS, MAX_READ_BITS, MAX_READ_REGISTERS, MAX_SLAVE_ADDRESS,
    MAX_WRITE_REGISTERS, MIN_SILENT_INTERVAL,
};

/// Crate version, as set in `Cargo.toml`.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_not_empty() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_public_reexports_compile() {
        let _ = InstrumentSettings::new();
        let _ = SerialSettings::default();
        let _: Result<u16> = Ok(0);
    }
}
