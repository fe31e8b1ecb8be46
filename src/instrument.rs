//! The `Instrument` facade: the public, per-slave API most callers use
//! instead of [`crate::engine::TransactionEngine`] directly (§4.5).

use tracing::info;

use crate::codec;
use crate::engine::TransactionEngine;
use crate::error::{ModbusError, Result};
use crate::transport::{SerialTransport, Transport};
use crate::types::{
    ByteOrder, FunctionCode, InstrumentSettings, SerialSettings, MAX_READ_BITS, MAX_READ_REGISTERS,
    MAX_WRITE_REGISTERS,
};

/// A single addressable slave device on a shared serial bus.
///
/// `Instrument` owns no state about the bus beyond its [`TransactionEngine`]
/// and the slave address it talks to; several instruments can share one
/// engine (and therefore one serialized transport) to address multiple
/// slaves on the same line.
pub struct Instrument<T: Transport> {
    engine: TransactionEngine<T>,
    slave: u8,
}

impl Instrument<SerialTransport> {
    /// Open an instrument over a native serial port at `path`, addressing
    /// slave `slave`.
    pub fn open(
        path: impl Into<String>,
        slave: u8,
        serial_settings: SerialSettings,
        instrument_settings: InstrumentSettings,
    ) -> Self {
        let transport = SerialTransport::new(path);
        Self::new(transport, slave, serial_settings, instrument_settings)
    }
}

impl<T: Transport> Instrument<T> {
    /// Build an instrument over an already-constructed transport (most
    /// useful for a test double; see [`crate::transport::ScriptedTransport`]).
    pub fn new(
        transport: T,
        slave: u8,
        serial_settings: SerialSettings,
        instrument_settings: InstrumentSettings,
    ) -> Self {
        Self {
            engine: TransactionEngine::new(transport, serial_settings, instrument_settings),
            slave,
        }
    }

    /// Build an instrument sharing an existing engine (and therefore its
    /// transport and mutex) — the way multiple slaves on one RS-485 bus
    /// are modelled.
    pub fn with_engine(engine: TransactionEngine<T>, slave: u8) -> Self {
        Self { engine, slave }
    }

    /// The slave address this instrument addresses.
    pub fn slave(&self) -> u8 {
        self.slave
    }

    /// The underlying transaction engine, for callers that need to build
    /// another [`Instrument`] sharing the same bus.
    pub fn engine(&self) -> &TransactionEngine<T> {
        &self.engine
    }

    fn debug_trace(&self, operation: &str) {
        if self.engine.instrument_settings().debug {
            info!(slave = self.slave, operation, "facade call completed");
        }
    }

    fn require_read_function_code(function_code: FunctionCode) -> Result<()> {
        if function_code.is_read() {
            Ok(())
        } else {
            Err(ModbusError::invalid_argument(format!(
                "{function_code:?} is not a read function code"
            )))
        }
    }

    // -- bit-level reads/writes ------------------------------------------------

    /// Read a single coil (fc 1) or discrete input (fc 2).
    pub fn read_bit(&self, address: u16, function_code: FunctionCode) -> Result<bool> {
        if !matches!(
            function_code,
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs
        ) {
            return Err(ModbusError::invalid_argument(format!(
                "{function_code:?} does not read bit-level data"
            )));
        }
        let bits = self.read_bits_raw(address, 1, function_code)?;
        self.debug_trace("read_bit");
        Ok(bits[0])
    }

    /// Read `count` consecutive coils or discrete inputs.
    pub fn read_bits(&self, address: u16, count: u16, function_code: FunctionCode) -> Result<Vec<bool>> {
        if !matches!(
            function_code,
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs
        ) {
            return Err(ModbusError::invalid_argument(format!(
                "{function_code:?} does not read bit-level data"
            )));
        }
        if count == 0 || count > MAX_READ_BITS {
            return Err(ModbusError::out_of_range(
                format!("bit count must be in 1..={MAX_READ_BITS}"),
                i64::from(count),
            ));
        }
        let bits = self.read_bits_raw(address, count, function_code)?;
        self.debug_trace("read_bits");
        Ok(bits)
    }

    fn read_bits_raw(&self, address: u16, count: u16, function_code: FunctionCode) -> Result<Vec<bool>> {
        let request = [
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            (count >> 8) as u8,
            (count & 0xFF) as u8,
        ];
        let response = self.engine.execute(self.slave, function_code, &request)?;
        let byte_count = *response.first().ok_or_else(|| ModbusError::InvalidResponse {
            message: "response missing byte count".into(),
            bytes: response.clone(),
        })? as usize;
        let data = response.get(1..1 + byte_count).ok_or_else(|| ModbusError::InvalidResponse {
            message: "response shorter than declared byte count".into(),
            bytes: response.clone(),
        })?;
        crate::framer::parse_bits_lenient(data, usize::from(count))
    }

    /// Write a single coil (fc 5).
    pub fn write_bit(&self, address: u16, value: bool) -> Result<()> {
        let coil_value = codec::encode_bit(value);
        let request = [(address >> 8) as u8, (address & 0xFF) as u8, coil_value[0], coil_value[1]];
        self.engine.execute(self.slave, FunctionCode::WriteSingleCoil, &request)?;
        self.debug_trace("write_bit");
        Ok(())
    }

    /// Write `values` to consecutive coils starting at `address` (fc 15).
    pub fn write_bits(&self, address: u16, values: &[bool]) -> Result<()> {
        if values.is_empty() || values.len() > usize::from(MAX_READ_BITS) {
            return Err(ModbusError::out_of_range(
                format!("bit count must be in 1..={MAX_READ_BITS}"),
                values.len() as i64,
            ));
        }
        let packed = codec::pack_bits(values);
        let mut request = vec![
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            (values.len() >> 8) as u8,
            (values.len() & 0xFF) as u8,
            packed.len() as u8,
        ];
        request.extend_from_slice(&packed);
        self.engine
            .execute(self.slave, FunctionCode::WriteMultipleCoils, &request)?;
        self.debug_trace("write_bits");
        Ok(())
    }

    // -- register-level reads/writes -------------------------------------------

    /// Read one 16-bit holding (fc 3) or input (fc 4) register.
    pub fn read_register(&self, address: u16, function_code: FunctionCode) -> Result<u16> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 1, function_code)?;
        self.debug_trace("read_register");
        codec::decode_u16(&data)
    }

    /// Read one register and divide it by `10^decimals`, per §4.1 value
    /// scaling. `decimals = 0` is a plain unsigned read.
    pub fn read_register_scaled(&self, address: u16, decimals: u32, function_code: FunctionCode) -> Result<f64> {
        let raw = self.read_register(address, function_code)?;
        Ok(codec::scale_from_register_u16(raw, decimals))
    }

    /// Read one register as a signed two's-complement 16-bit value.
    pub fn read_register_signed(&self, address: u16, function_code: FunctionCode) -> Result<i16> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 1, function_code)?;
        self.debug_trace("read_register_signed");
        codec::decode_i16(&data)
    }

    /// Read one register as a signed two's-complement value and divide it
    /// by `10^decimals`, the signed counterpart of
    /// [`Self::read_register_scaled`].
    pub fn read_register_scaled_signed(&self, address: u16, decimals: u32, function_code: FunctionCode) -> Result<f64> {
        let raw = self.read_register_signed(address, function_code)?;
        Ok(codec::scale_from_register_i16(raw, decimals))
    }

    /// Read `count` consecutive 16-bit registers.
    pub fn read_registers(&self, address: u16, count: u16, function_code: FunctionCode) -> Result<Vec<u16>> {
        Self::require_read_function_code(function_code)?;
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(ModbusError::out_of_range(
                format!("register count must be in 1..={MAX_READ_REGISTERS}"),
                i64::from(count),
            ));
        }
        let data = self.read_registers_raw(address, count, function_code)?;
        self.debug_trace("read_registers");
        data.chunks_exact(2).map(codec::decode_u16).collect()
    }

    fn read_registers_raw(&self, address: u16, count: u16, function_code: FunctionCode) -> Result<Vec<u8>> {
        let request = [
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            (count >> 8) as u8,
            (count & 0xFF) as u8,
        ];
        let response = self.engine.execute(self.slave, function_code, &request)?;
        let byte_count = *response.first().ok_or_else(|| ModbusError::InvalidResponse {
            message: "response missing byte count".into(),
            bytes: response.clone(),
        })? as usize;
        response
            .get(1..1 + byte_count)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ModbusError::InvalidResponse {
                message: "response shorter than declared byte count".into(),
                bytes: response.clone(),
            })
    }

    /// Write one 16-bit register via fc 16 (write multiple registers, with
    /// `reg_count=1`), per §4.5's default. Use [`Self::write_single_register`]
    /// for the fc 6 alternative some slaves require instead.
    pub fn write_register(&self, address: u16, value: u16) -> Result<()> {
        self.write_registers(address, &[value])?;
        self.debug_trace("write_register");
        Ok(())
    }

    /// Write one 16-bit register via fc 6 (write single register), the
    /// optional alternative to [`Self::write_register`]'s fc 16 default
    /// (§4.4).
    pub fn write_single_register(&self, address: u16, value: u16) -> Result<()> {
        let bytes = codec::encode_u16(value);
        let request = [(address >> 8) as u8, (address & 0xFF) as u8, bytes[0], bytes[1]];
        self.engine
            .execute(self.slave, FunctionCode::WriteSingleRegister, &request)?;
        self.debug_trace("write_single_register");
        Ok(())
    }

    /// Multiply `number` by `10^decimals`, round to the nearest integer,
    /// and write it to one register via fc 16 (§4.5's default).
    pub fn write_register_scaled(&self, address: u16, number: f64, decimals: u32) -> Result<()> {
        let raw = codec::scale_to_register_u16(number, decimals)?;
        self.write_register(address, raw)
    }

    /// As [`Self::write_register_scaled`], but via fc 6 (write single
    /// register) instead of fc 16.
    pub fn write_single_register_scaled(&self, address: u16, number: f64, decimals: u32) -> Result<()> {
        let raw = codec::scale_to_register_u16(number, decimals)?;
        self.write_single_register(address, raw)
    }

    /// Signed counterpart of [`Self::write_register_scaled`]: multiply
    /// `number` by `10^decimals`, round to the nearest integer, validate it
    /// fits a signed 16-bit register, and write it via fc 16.
    pub fn write_register_scaled_signed(&self, address: u16, number: f64, decimals: u32) -> Result<()> {
        let raw = codec::scale_to_register_i16(number, decimals)?;
        self.write_register(address, raw as u16)
    }

    /// As [`Self::write_register_scaled_signed`], but via fc 6 (write
    /// single register) instead of fc 16.
    pub fn write_single_register_scaled_signed(&self, address: u16, number: f64, decimals: u32) -> Result<()> {
        let raw = codec::scale_to_register_i16(number, decimals)?;
        self.write_single_register(address, raw as u16)
    }

    /// Write `values` to consecutive registers starting at `address` (fc 16).
    pub fn write_registers(&self, address: u16, values: &[u16]) -> Result<()> {
        if values.is_empty() || values.len() > usize::from(MAX_WRITE_REGISTERS) {
            return Err(ModbusError::out_of_range(
                format!("register count must be in 1..={MAX_WRITE_REGISTERS}"),
                values.len() as i64,
            ));
        }
        let mut request = vec![
            (address >> 8) as u8,
            (address & 0xFF) as u8,
            (values.len() >> 8) as u8,
            (values.len() & 0xFF) as u8,
            (values.len() * 2) as u8,
        ];
        for &v in values {
            request.extend_from_slice(&codec::encode_u16(v));
        }
        self.engine
            .execute(self.slave, FunctionCode::WriteMultipleRegisters, &request)?;
        self.debug_trace("write_registers");
        Ok(())
    }

    // -- multi-register values --------------------------------------------------

    /// Read a 32-bit unsigned value spanning 2 registers.
    pub fn read_long(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<u32> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 2, function_code)?;
        self.debug_trace("read_long");
        codec::decode_u32(&data, byte_order)
    }

    /// Read a 32-bit signed value spanning 2 registers.
    pub fn read_long_signed(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<i32> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 2, function_code)?;
        self.debug_trace("read_long_signed");
        codec::decode_i32(&data, byte_order)
    }

    /// Write a 32-bit unsigned value across 2 registers (fc 16).
    pub fn write_long(&self, address: u16, value: u32, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_u32(value, byte_order);
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_long");
        Ok(())
    }

    /// Write a 32-bit signed value across 2 registers (fc 16).
    pub fn write_long_signed(&self, address: u16, value: i32, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_i32(value, byte_order);
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_long_signed");
        Ok(())
    }

    /// Read a 64-bit unsigned value spanning 4 registers (`bit_length=64`
    /// variant of `read_long`, per §4.5).
    pub fn read_long64(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<u64> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 4, function_code)?;
        self.debug_trace("read_long64");
        codec::decode_u64(&data, byte_order)
    }

    /// Read a 64-bit signed value spanning 4 registers.
    pub fn read_long64_signed(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<i64> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 4, function_code)?;
        self.debug_trace("read_long64_signed");
        codec::decode_i64(&data, byte_order)
    }

    /// Write a 64-bit unsigned value across 4 registers (fc 16).
    pub fn write_long64(&self, address: u16, value: u64, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_u64(value, byte_order);
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_long64");
        Ok(())
    }

    /// Write a 64-bit signed value across 4 registers (fc 16).
    pub fn write_long64_signed(&self, address: u16, value: i64, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_i64(value, byte_order);
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_long64_signed");
        Ok(())
    }

    /// Read an IEEE-754 binary32 float spanning 2 registers
    /// (`bit_length=32` variant of `read_float`, per §4.5).
    pub fn read_float(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<f32> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 2, function_code)?;
        self.debug_trace("read_float");
        codec::decode_f32(&data, byte_order)
    }

    /// Write an IEEE-754 binary32 float across 2 registers (fc 16).
    pub fn write_float(&self, address: u16, value: f32, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_f32(value, byte_order)?;
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_float");
        Ok(())
    }

    /// Read an IEEE-754 binary64 float spanning 4 registers
    /// (`bit_length=64` variant of `read_float`, per §4.5).
    pub fn read_double(&self, address: u16, byte_order: ByteOrder, function_code: FunctionCode) -> Result<f64> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, 4, function_code)?;
        self.debug_trace("read_double");
        codec::decode_f64(&data, byte_order)
    }

    /// Write an IEEE-754 binary64 float across 4 registers (fc 16).
    pub fn write_double(&self, address: u16, value: f64, byte_order: ByteOrder) -> Result<()> {
        let data = codec::encode_f64(value, byte_order)?;
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_double");
        Ok(())
    }

    /// Read `num_registers` registers as raw text bytes. No trimming of
    /// padding is performed.
    pub fn read_string(&self, address: u16, num_registers: u16, function_code: FunctionCode) -> Result<Vec<u8>> {
        Self::require_read_function_code(function_code)?;
        let data = self.read_registers_raw(address, num_registers, function_code)?;
        self.debug_trace("read_string");
        codec::decode_string(&data, num_registers)
    }

    /// Write `text`, space-padded, across `num_registers` registers (fc 16).
    pub fn write_string(&self, address: u16, text: &[u8], num_registers: u16) -> Result<()> {
        let data = codec::encode_string(text, num_registers)?;
        self.write_registers(address, &bytes_to_registers(&data))?;
        self.debug_trace("write_string");
        Ok(())
    }

    /// Escape hatch for slave-specific function codes this crate does not
    /// model as a [`FunctionCode`] variant: send `function_code` with a
    /// caller-assembled `payload` and return the raw response payload
    /// unparsed. This does not define a new Modbus function code — it
    /// only lets a caller drive one the slave already implements.
    pub fn custom_command(&self, function_code: u8, payload: &[u8], expected_response_len: usize) -> Result<Vec<u8>> {
        self.engine
            .execute_raw(self.slave, function_code, payload, expected_response_len)
    }
}

/// Regroup a flat byte buffer (already in on-wire order) into 16-bit
/// big-endian register values, the shape `write_registers` expects.
fn bytes_to_registers(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer;
    use crate::transport::ScriptedTransport;

    fn instrument_with(transport: ScriptedTransport) -> Instrument<ScriptedTransport> {
        Instrument::new(
            transport,
            1,
            SerialSettings::new(115_200),
            InstrumentSettings::new(),
        )
    }

    #[test]
    fn test_read_register() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_register(0x0000, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 0x00BA);
    }

    #[test]
    fn test_read_register_scaled_scenario() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_register_scaled(0x0000, 1, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 18.6);
    }

    #[test]
    fn test_write_register() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x10, &[0x00, 0x01, 0x00, 0x01]));
        let instrument = instrument_with(transport);
        instrument.write_register(0x0001, 0x0003).unwrap();
    }

    #[test]
    fn test_write_single_register() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x06, &[0x00, 0x01, 0x00, 0x03]));
        let instrument = instrument_with(transport);
        instrument.write_single_register(0x0001, 0x0003).unwrap();
    }

    #[test]
    fn test_read_register_scaled_signed() {
        let mut transport = ScriptedTransport::new();
        // 0xFF38 as i16 is -200; divided by 10^1 -> -20.0.
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0xFF, 0x38]));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_register_scaled_signed(0x0000, 1, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, -20.0);
    }

    #[test]
    fn test_write_register_scaled_signed() {
        let mut transport = ScriptedTransport::new();
        // -20.0 * 10^1 = -200 = 0xFF38 as a register bit pattern.
        transport.push_response(&framer::build_rtu_frame(1, 0x10, &[0x00, 0x01, 0x00, 0x01]));
        let instrument = instrument_with(transport);
        instrument.write_register_scaled_signed(0x0001, -20.0, 1).unwrap();
        assert_eq!(
            instrument.engine().transport().writes[0][7..9],
            [0xFF, 0x38]
        );
    }

    #[test]
    fn test_write_single_register_scaled_signed() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x06, &[0x00, 0x01, 0xFF, 0x38]));
        let instrument = instrument_with(transport);
        instrument
            .write_single_register_scaled_signed(0x0001, -20.0, 1)
            .unwrap();
    }

    #[test]
    fn test_read_bit() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x02, &[0x01, 0x01]));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_bit(0x0010, FunctionCode::ReadDiscreteInputs)
            .unwrap();
        assert!(value);
    }

    #[test]
    fn test_write_bit() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x05, &[0x00, 0x01, 0xFF, 0x00]));
        let instrument = instrument_with(transport);
        instrument.write_bit(0x0001, true).unwrap();
    }

    #[test]
    fn test_write_bits_multiple_coils() {
        let mut transport = ScriptedTransport::new();
        // Echo: start_addr=0x0010, bit_count=3.
        transport.push_response(&framer::build_rtu_frame(1, 0x0F, &[0x00, 0x10, 0x00, 0x03]));
        let instrument = instrument_with(transport);
        instrument
            .write_bits(0x0010, &[true, false, true])
            .unwrap();
    }

    #[test]
    fn test_read_bit_rejects_non_bit_function_code() {
        let transport = ScriptedTransport::new();
        let instrument = instrument_with(transport);
        assert!(instrument
            .read_bit(0x0001, FunctionCode::ReadHoldingRegisters)
            .is_err());
    }

    #[test]
    fn test_slave_exception_scenario() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x83, &[0x02]));
        let instrument = instrument_with(transport);
        let result = instrument.read_register(0x0100, FunctionCode::ReadHoldingRegisters);
        assert!(matches!(
            result,
            Err(ModbusError::SlaveException {
                code: crate::types::ExceptionCode::IllegalDataAddress
            })
        ));
    }

    #[test]
    fn test_float_round_trip_via_engine() {
        let mut transport = ScriptedTransport::new();
        let data = codec::encode_f32(200.0, ByteOrder::Big).unwrap();
        let mut payload = vec![data.len() as u8];
        payload.extend_from_slice(&data);
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &payload));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_float(0x0000, ByteOrder::Big, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 200.0);
    }

    #[test]
    fn test_read_long64_round_trip_via_engine() {
        let mut transport = ScriptedTransport::new();
        let data = codec::encode_u64(0x0123_4567_89AB_CDEF, ByteOrder::Big);
        let mut payload = vec![data.len() as u8];
        payload.extend_from_slice(&data);
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &payload));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_long64(0x0000, ByteOrder::Big, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 0x0123_4567_89AB_CDEF);
    }

    #[test]
    fn test_read_double_round_trip_via_engine() {
        let mut transport = ScriptedTransport::new();
        let data = codec::encode_f64(325.8, ByteOrder::Big).unwrap();
        let mut payload = vec![data.len() as u8];
        payload.extend_from_slice(&data);
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &payload));
        let instrument = instrument_with(transport);
        let value = instrument
            .read_double(0x0000, ByteOrder::Big, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 325.8);
    }

    #[test]
    fn test_ascii_mode_read_register_scenario() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_ascii_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let instrument = Instrument::new(
            transport,
            1,
            SerialSettings::new(115_200),
            InstrumentSettings::ascii(),
        );
        let value = instrument
            .read_register(0x0000, FunctionCode::ReadHoldingRegisters)
            .unwrap();
        assert_eq!(value, 0x00BA);
    }
}
