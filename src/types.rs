//! Core types for the Modbus master engine.
//!
//! This module defines the fundamental value types shared across the
//! codec, framer, transaction engine, and instrument facade: addresses,
//! function codes, byte-order tags, framing mode, exception codes, and
//! the instrument/serial configuration structs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Broadcast slave address: request is transmitted, no response expected.
pub const BROADCAST_ADDRESS: u8 = 0;

/// Maximum accepted slave address (reserved range included).
pub const MAX_SLAVE_ADDRESS: u8 = 255;

/// Maximum number of coils/discrete inputs in a single read (fc 1, 2).
pub const MAX_READ_BITS: u16 = 2000;

/// Maximum number of registers in a single read (fc 3, 4).
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of registers in a single write (fc 16).
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// Minimum inter-frame silent interval mandated by the RTU standard.
pub const MIN_SILENT_INTERVAL: Duration = Duration::from_micros(1750);

/// The Modbus function codes implemented by this engine.
///
/// Response codes with the high bit set (`fc | 0x80`) denote slave-reported
/// exceptions and are represented separately by [`crate::error::ModbusError::SlaveException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FunctionCode {
    /// Read coils (0x01): read/write single-bit storage.
    ReadCoils,
    /// Read discrete inputs (0x02): read-only single-bit storage.
    ReadDiscreteInputs,
    /// Read holding registers (0x03): read/write 16-bit storage.
    ReadHoldingRegisters,
    /// Read input registers (0x04): read-only 16-bit storage.
    ReadInputRegisters,
    /// Write single coil (0x05).
    WriteSingleCoil,
    /// Write single register (0x06).
    WriteSingleRegister,
    /// Write multiple coils (0x0F).
    WriteMultipleCoils,
    /// Write multiple registers (0x10).
    WriteMultipleRegisters,
}

impl FunctionCode {
    /// The raw wire value of this function code.
    pub fn code(self) -> u8 {
        match self {
            FunctionCode::ReadCoils => 0x01,
            FunctionCode::ReadDiscreteInputs => 0x02,
            FunctionCode::ReadHoldingRegisters => 0x03,
            FunctionCode::ReadInputRegisters => 0x04,
            FunctionCode::WriteSingleCoil => 0x05,
            FunctionCode::WriteSingleRegister => 0x06,
            FunctionCode::WriteMultipleCoils => 0x0F,
            FunctionCode::WriteMultipleRegisters => 0x10,
        }
    }

    /// Resolve a raw wire value into a known function code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(FunctionCode::ReadCoils),
            0x02 => Some(FunctionCode::ReadDiscreteInputs),
            0x03 => Some(FunctionCode::ReadHoldingRegisters),
            0x04 => Some(FunctionCode::ReadInputRegisters),
            0x05 => Some(FunctionCode::WriteSingleCoil),
            0x06 => Some(FunctionCode::WriteSingleRegister),
            0x0F => Some(FunctionCode::WriteMultipleCoils),
            0x10 => Some(FunctionCode::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Whether this function code reads data back from the slave (as
    /// opposed to echoing the request header on a successful write).
    pub fn is_read(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
        )
    }
}

/// Exception codes a slave may report in the single byte following a
/// masked function code (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ExceptionCode {
    /// 1: the function code is not supported by the slave.
    IllegalFunction,
    /// 2: the data address is not valid for the slave.
    IllegalDataAddress,
    /// 3: a value in the request is not valid for the slave.
    IllegalDataValue,
    /// 4: an unrecoverable error occurred while the slave processed the request.
    SlaveDeviceFailure,
    /// 5: the slave accepted the request but needs a long time to process it.
    Acknowledge,
    /// 6: the slave is busy processing a long-duration command.
    SlaveDeviceBusy,
    /// 7: the slave cannot perform the requested function.
    NegativeAcknowledge,
    /// 8: the slave detected a parity error in extended memory.
    MemoryParityError,
    /// 10: the gateway could not allocate an internal path.
    GatewayPathUnavailable,
    /// 11: the target device behind the gateway did not respond.
    GatewayTargetDeviceFailedToRespond,
    /// Any exception code not enumerated above.
    Other(u8),
}

impl ExceptionCode {
    /// Decode an exception code byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => ExceptionCode::IllegalFunction,
            2 => ExceptionCode::IllegalDataAddress,
            3 => ExceptionCode::IllegalDataValue,
            4 => ExceptionCode::SlaveDeviceFailure,
            5 => ExceptionCode::Acknowledge,
            6 => ExceptionCode::SlaveDeviceBusy,
            7 => ExceptionCode::NegativeAcknowledge,
            8 => ExceptionCode::MemoryParityError,
            10 => ExceptionCode::GatewayPathUnavailable,
            11 => ExceptionCode::GatewayTargetDeviceFailedToRespond,
            other => ExceptionCode::Other(other),
        }
    }

    /// The raw wire value of this exception code.
    pub fn to_byte(self) -> u8 {
        match self {
            ExceptionCode::IllegalFunction => 1,
            ExceptionCode::IllegalDataAddress => 2,
            ExceptionCode::IllegalDataValue => 3,
            ExceptionCode::SlaveDeviceFailure => 4,
            ExceptionCode::Acknowledge => 5,
            ExceptionCode::SlaveDeviceBusy => 6,
            ExceptionCode::NegativeAcknowledge => 7,
            ExceptionCode::MemoryParityError => 8,
            ExceptionCode::GatewayPathUnavailable => 10,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => 11,
            ExceptionCode::Other(b) => b,
        }
    }
}

/// Byte-order tag selecting how a multi-register value is assembled across
/// registers before transmission (§4.1). Meaningful only for 32- and
/// 64-bit values spanning multiple registers; each individual register is
/// always transmitted big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// `ABCD` / `ABCDEFGH` — registers and bytes both in big-endian order.
    #[default]
    Big,
    /// `BADC` / `BADCFEHG` — bytes swapped within each big-endian register.
    BigSwap,
    /// `CDAB` / `GHEFCDAB` — registers in little-endian order, bytes within
    /// each register big-endian.
    LittleSwap,
    /// `DCBA` / `HGFEDCBA` — registers and bytes both in little-endian order.
    Little,
}

/// Framing mode: binary RTU or text-based ASCII. Fixed for the lifetime of
/// a transaction (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FramingMode {
    /// Binary framing with CRC-16 and inter-frame silence delimiting.
    #[default]
    Rtu,
    /// Text framing with `:` start, hex encoding, LRC, and CR/LF stop.
    Ascii,
}

/// Parity setting for the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit (the Modbus default).
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// Serial-line parameters consumed by the [`crate::transport::Transport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Character size in data bits (8 for standard Modbus).
    pub data_bits: u8,
    /// Number of stop bits (1 for standard Modbus).
    pub stop_bits: u8,
    /// Parity mode.
    pub parity: Parity,
    /// Bound on a single write call.
    #[serde(with = "duration_millis")]
    pub write_timeout: Duration,
    /// Bound on a single read call.
    #[serde(with = "duration_millis")]
    pub read_timeout: Duration,
}

impl SerialSettings {
    /// Settings matching the Modbus standard default: 9600 8N1, 1 s timeouts.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            write_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
        }
    }

    /// The minimum inter-frame silent interval for this baud rate: the
    /// larger of 1.75 ms and the time to transmit 3.5 characters (11 bits
    /// each: start bit, 8 data bits, stop bit, accounting for the common
    /// no-parity framing) at `baud_rate`.
    pub fn silent_interval(&self) -> Duration {
        let char_time_based = Duration::from_secs_f64(3.5 * 11.0 / f64::from(self.baud_rate));
        char_time_based.max(MIN_SILENT_INTERVAL)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new(9600)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Configuration of an [`crate::instrument::Instrument`] (§3 Lifecycle, §5
/// Resource acquisition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSettings {
    /// RTU or ASCII framing.
    pub mode: FramingMode,
    /// Whether every exchange reads-and-discards a request-length prefix
    /// before reading the real response (local echo on the serial bus).
    pub local_echo: bool,
    /// Whether the transport is opened before each `execute()` call and
    /// closed on every exit path, rather than held open for the
    /// instrument's lifetime.
    pub close_port_after_each_call: bool,
    /// Whether successful facade operations emit `tracing::info!` in
    /// addition to the `tracing::debug!`/`trace!` events the engine always
    /// emits.
    pub debug: bool,
    /// Compatibility knob (§9 Open Question b): tolerate and discard a
    /// trailing `0xFE` byte some slaves append to fc=3/4 responses. Not
    /// applied unless explicitly enabled.
    pub tolerate_trailing_byte: bool,
}

impl Default for InstrumentSettings {
    fn default() -> Self {
        Self {
            mode: FramingMode::Rtu,
            local_echo: false,
            close_port_after_each_call: false,
            debug: false,
            tolerate_trailing_byte: false,
        }
    }
}

impl InstrumentSettings {
    /// Standard RTU settings: no local echo, port held open, no debug trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// ASCII framing, otherwise standard.
    pub fn ascii() -> Self {
        Self {
            mode: FramingMode::Ascii,
            ..Self::default()
        }
    }

    /// Settings for a half-duplex RS-485 bus that echoes every transmitted
    /// octet back to the master.
    pub fn with_local_echo() -> Self {
        Self {
            local_echo: true,
            ..Self::default()
        }
    }
}
