//! Transaction engine: the half-duplex, stop-and-wait exchange loop that
//! drives a single request/response pair over a [`Transport`] (§4.4, §5).

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace, warn};

use crate::error::{ModbusError, Result};
use crate::framer::{self, ParsedFrame};
use crate::transport::{wait_silent_interval, Transport};
use crate::types::{ExceptionCode, FramingMode, FunctionCode, InstrumentSettings, SerialSettings, BROADCAST_ADDRESS};

/// Internal progress marker for one `execute()` call (§4.4's state
/// machine: `Idle → Waiting-Silence → Sending → Waiting-Echo? → Reading →
/// Parsing → (Ok | Err) → Idle`). Never exposed to callers; surfaced only
/// through `tracing` span fields, so a trace of a stuck exchange shows
/// which phase it never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExchangeState {
    Idle,
    WaitingSilence,
    Sending,
    WaitingEcho,
    Reading,
    Parsing,
}

impl ExchangeState {
    fn advance_to(self, next: ExchangeState) -> ExchangeState {
        trace!(from = ?self, to = ?next, "exchange state transition");
        next
    }
}

/// Drives one request/response exchange at a time over a shared
/// [`Transport`], serialized by an internal mutex (§5 Resource model: a
/// serial line is a single shared resource, never accessed concurrently).
pub struct TransactionEngine<T: Transport> {
    transport: Arc<Mutex<T>>,
    serial_settings: SerialSettings,
    instrument_settings: InstrumentSettings,
}

impl<T: Transport> TransactionEngine<T> {
    /// Build an engine over an already-constructed transport.
    pub fn new(
        transport: T,
        serial_settings: SerialSettings,
        instrument_settings: InstrumentSettings,
    ) -> Self {
        Self {
            transport: Arc::new(Mutex::new(transport)),
            serial_settings,
            instrument_settings,
        }
    }

    /// The serial-line parameters this engine was built with.
    pub fn serial_settings(&self) -> &SerialSettings {
        &self.serial_settings
    }

    /// The instrument-level behavior flags this engine was built with.
    pub fn instrument_settings(&self) -> &InstrumentSettings {
        &self.instrument_settings
    }

    /// Lock and return the underlying transport directly, bypassing the
    /// exchange machinery. Intended for tests that assert on what was
    /// written to a [`crate::transport::ScriptedTransport`] double, and for
    /// diagnostics that need transport-level state (e.g. `is_open`).
    pub fn transport(&self) -> MutexGuard<'_, T> {
        self.transport
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one request/response exchange: build the frame for
    /// `(slave, function_code, request_payload)`, transmit it, and return
    /// the validated response payload.
    ///
    /// For a broadcast address (`0`), the request is transmitted and
    /// `Ok(Vec::new())` is returned immediately; slaves never reply to a
    /// broadcast (§4.4 edge case).
    #[tracing::instrument(skip(self, request_payload), fields(slave, function_code = function_code.code()))]
    pub fn execute(
        &self,
        slave: u8,
        function_code: FunctionCode,
        request_payload: &[u8],
    ) -> Result<Vec<u8>> {
        let expected_len = match self.instrument_settings.mode {
            FramingMode::Rtu => framer::expected_rtu_response_len(function_code, request_payload),
            FramingMode::Ascii => framer::expected_ascii_response_len(function_code, request_payload),
        };
        let response = self.execute_raw(slave, function_code.code(), request_payload, expected_len)?;
        if slave != BROADCAST_ADDRESS {
            verify_response_shape(function_code, request_payload, &response)?;
        }
        Ok(response)
    }

    /// Run one request/response exchange for a raw function code byte,
    /// with the caller supplying the expected response length directly
    /// instead of having it derived from a known [`FunctionCode`]. This
    /// is the escape hatch behind [`crate::instrument::Instrument::custom_command`]
    /// for slave-specific function codes this crate does not model.
    pub fn execute_raw(
        &self,
        slave: u8,
        function_code: u8,
        request_payload: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>> {
        let guard = self
            .transport
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut transport = ClosePortGuard {
            guard,
            should_close: self.instrument_settings.close_port_after_each_call,
        };

        let mut state = ExchangeState::Idle;

        if transport.should_close || !transport.is_open() {
            transport.open(&self.serial_settings)?;
        }

        state = state.advance_to(ExchangeState::WaitingSilence);
        wait_silent_interval(self.serial_settings.silent_interval());
        transport.clear_input()?;
        transport.clear_output()?;

        let request_frame = match self.instrument_settings.mode {
            FramingMode::Rtu => framer::build_rtu_frame(slave, function_code, request_payload),
            FramingMode::Ascii => framer::build_ascii_frame(slave, function_code, request_payload),
        };
        state = state.advance_to(ExchangeState::Sending);
        trace!(?state, frame = ?request_frame, "transmitting request");
        transport.write_all(&request_frame)?;

        if slave == BROADCAST_ADDRESS {
            debug!("broadcast address, not awaiting a response");
            return Ok(Vec::new());
        }

        if self.instrument_settings.local_echo {
            state = state.advance_to(ExchangeState::WaitingEcho);
            let mut echo = vec![0u8; request_frame.len()];
            read_exact_or_timeout(&mut *transport, &mut echo)?;
            if echo != request_frame {
                return Err(ModbusError::LocalEchoMismatch {
                    sent: request_frame,
                    echoed: echo,
                });
            }
        }

        state = state.advance_to(ExchangeState::Reading);
        let mut response = vec![0u8; expected_len];
        let read_count = read_up_to(&mut *transport, &mut response)?;
        if read_count == 0 {
            return Err(ModbusError::NoResponse);
        }
        response.truncate(read_count);
        if read_count < expected_len {
            // A slave exception reply is shorter than a normal reply; a
            // genuinely short read is only an error once we've confirmed
            // it isn't an exception frame.
            if !looks_like_exception_frame(&response, self.instrument_settings.mode) {
                return Err(ModbusError::ShortResponse {
                    expected: expected_len,
                    actual: read_count,
                });
            }
        }

        state = state.advance_to(ExchangeState::Parsing);
        trace!(?state, "parsing response frame");
        let parsed = match self.instrument_settings.mode {
            FramingMode::Rtu => framer::parse_rtu_frame(
                &response,
                slave,
                self.instrument_settings.tolerate_trailing_byte,
            )?,
            FramingMode::Ascii => framer::parse_ascii_frame(&response, slave)?,
        };

        if parsed.function_code & 0x7F != function_code {
            return Err(ModbusError::InvalidResponse {
                message: format!(
                    "response function code 0x{:02X} does not match requested function code 0x{function_code:02X}",
                    parsed.function_code & 0x7F
                ),
                bytes: response,
            });
        }

        self.interpret(parsed)
    }

    fn interpret(&self, parsed: ParsedFrame) -> Result<Vec<u8>> {
        if parsed.is_exception {
            let code = parsed
                .payload
                .first()
                .copied()
                .map(ExceptionCode::from_byte)
                .ok_or_else(|| ModbusError::InvalidResponse {
                    message: "exception reply carries no exception code byte".into(),
                    bytes: Vec::new(),
                })?;
            warn!(?code, "slave reported exception");
            return Err(ModbusError::SlaveException { code });
        }
        Ok(parsed.payload)
    }
}

/// Verify the per-function-code shape of a successfully parsed, non-exception
/// response payload against the request that produced it (§4.4): a read's
/// declared byte count must match the requested bit/register count, and a
/// write's echoed header fields must match what was sent.
fn verify_response_shape(
    function_code: FunctionCode,
    request_payload: &[u8],
    response_payload: &[u8],
) -> Result<()> {
    match function_code {
        FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
            let count = be_u16(request_payload, 2);
            verify_byte_count(response_payload, usize::from(count).div_ceil(8))
        }
        FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => {
            let count = be_u16(request_payload, 2);
            verify_byte_count(response_payload, usize::from(count) * 2)
        }
        FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => {
            verify_echo(request_payload, response_payload, 4, "address/value")
        }
        FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
            verify_echo(request_payload, response_payload, 4, "address/count")
        }
    }
}

fn be_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([bytes[offset], bytes[offset + 1]])
}

fn verify_byte_count(response_payload: &[u8], expected: usize) -> Result<()> {
    let actual = *response_payload
        .first()
        .ok_or_else(|| ModbusError::InvalidResponse {
            message: "response missing byte count".into(),
            bytes: response_payload.to_vec(),
        })? as usize;
    if actual != expected {
        return Err(ModbusError::InvalidResponse {
            message: format!("response byte count {actual} does not match expected {expected}"),
            bytes: response_payload.to_vec(),
        });
    }
    Ok(())
}

fn verify_echo(
    request_payload: &[u8],
    response_payload: &[u8],
    header_len: usize,
    fields: &str,
) -> Result<()> {
    if response_payload.get(..header_len) != request_payload.get(..header_len) {
        return Err(ModbusError::InvalidResponse {
            message: format!("response echoed {fields} does not match request"),
            bytes: response_payload.to_vec(),
        });
    }
    Ok(())
}

/// A minimal-length exception reply is 3 bytes for RTU (addr, fc|0x80,
/// code) before CRC, or the hex-doubled equivalent for ASCII; used to
/// decide whether an under-length read should still be parsed rather
/// than rejected outright.
fn looks_like_exception_frame(bytes: &[u8], mode: FramingMode) -> bool {
    match mode {
        FramingMode::Rtu => bytes.len() >= 2 && bytes[1] & 0x80 != 0,
        FramingMode::Ascii => {
            bytes.len() >= 7 && hex::decode(&bytes[3..5]).is_ok_and(|fc| fc[0] & 0x80 != 0)
        }
    }
}

fn read_up_to<T: Transport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = transport.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}

fn read_exact_or_timeout<T: Transport + ?Sized>(transport: &mut T, buf: &mut [u8]) -> Result<()> {
    let n = read_up_to(transport, buf)?;
    if n < buf.len() {
        return Err(ModbusError::ShortResponse {
            expected: buf.len(),
            actual: n,
        });
    }
    Ok(())
}

/// Wraps the locked transport for the duration of one `execute()` call
/// and closes it on drop when `should_close` is set, implementing §5's
/// "close port after each call" resource discipline as an RAII guard
/// rather than a manual try/finally — the port is closed on every exit
/// path, including `?`-propagated errors.
struct ClosePortGuard<'a, T: Transport> {
    guard: MutexGuard<'a, T>,
    should_close: bool,
}

impl<T: Transport> Deref for ClosePortGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Transport> DerefMut for ClosePortGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T: Transport> Drop for ClosePortGuard<'_, T> {
    fn drop(&mut self) {
        if self.should_close {
            if let Err(e) = self.guard.close() {
                warn!(error = %e, "failed to close transport after call");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScriptedTransport;

    fn engine_with(transport: ScriptedTransport) -> TransactionEngine<ScriptedTransport> {
        TransactionEngine::new(
            transport,
            SerialSettings::new(115_200),
            InstrumentSettings::new(),
        )
    }

    #[test]
    fn test_execute_read_holding_registers() {
        let mut transport = ScriptedTransport::new();
        // Response to fc3, slave 1, start 0, qty 1: value 0x1234.
        let response = framer::build_rtu_frame(1, 0x03, &[0x02, 0x12, 0x34]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let payload = engine
            .execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(payload, vec![0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_execute_broadcast_returns_immediately() {
        let transport = ScriptedTransport::new();
        let engine = engine_with(transport);
        let payload = engine
            .execute(BROADCAST_ADDRESS, FunctionCode::WriteSingleRegister, &[0x00, 0x01, 0x00, 0x02])
            .unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_execute_no_response_times_out() {
        let transport = ScriptedTransport::new();
        let engine = engine_with(transport);
        let result = engine.execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(ModbusError::NoResponse)));
    }

    #[test]
    fn test_execute_slave_exception() {
        let mut transport = ScriptedTransport::new();
        let response = framer::build_rtu_frame(1, 0x83, &[0x02]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let result = engine.execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(
            result,
            Err(ModbusError::SlaveException {
                code: ExceptionCode::IllegalDataAddress
            })
        ));
    }

    #[test]
    fn test_execute_local_echo_mismatch() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&[0xDE, 0xAD, 0xBE, 0xEF, 0xFF, 0xFF, 0xFF, 0xFF]);
        let mut settings = InstrumentSettings::new();
        settings.local_echo = true;
        let engine = TransactionEngine::new(transport, SerialSettings::new(115_200), settings);

        let result = engine.execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(ModbusError::LocalEchoMismatch { .. })));
    }

    #[test]
    fn test_execute_local_echo_then_response() {
        let mut transport = ScriptedTransport::new();
        transport.echo = true;
        let response = framer::build_rtu_frame(1, 0x03, &[0x02, 0x12, 0x34]);
        transport.push_response(&response);
        let mut settings = InstrumentSettings::new();
        settings.local_echo = true;
        let engine = TransactionEngine::new(transport, SerialSettings::new(115_200), settings);

        let payload = engine
            .execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(payload, vec![0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_execute_ascii_mode() {
        let mut transport = ScriptedTransport::new();
        let response = framer::build_ascii_frame(1, 0x03, &[0x02, 0x12, 0x34]);
        transport.push_response(&response);
        let engine = TransactionEngine::new(transport, SerialSettings::new(115_200), InstrumentSettings::ascii());

        let payload = engine
            .execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01])
            .unwrap();
        assert_eq!(payload, vec![0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_execute_rejects_wrong_byte_count() {
        let mut transport = ScriptedTransport::new();
        // Requested 1 register (2 bytes) but the slave's byte count claims 4.
        let response = framer::build_rtu_frame(1, 0x03, &[0x04, 0x12, 0x34, 0x56, 0x78]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let result = engine.execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(ModbusError::InvalidResponse { .. })));
    }

    #[test]
    fn test_execute_rejects_mismatched_write_echo() {
        let mut transport = ScriptedTransport::new();
        // Request writes value 0x0003 to address 1; slave echoes a different value.
        let response = framer::build_rtu_frame(1, 0x06, &[0x00, 0x01, 0x00, 0x99]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let result = engine.execute(1, FunctionCode::WriteSingleRegister, &[0x00, 0x01, 0x00, 0x03]);
        assert!(matches!(result, Err(ModbusError::InvalidResponse { .. })));
    }

    #[test]
    fn test_execute_accepts_matching_write_multiple_echo() {
        let mut transport = ScriptedTransport::new();
        let response = framer::build_rtu_frame(1, 0x10, &[0x00, 0x00, 0x00, 0x02]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let result = engine.execute(
            1,
            FunctionCode::WriteMultipleRegisters,
            &[0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x01, 0x00, 0x02],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_execute_rejects_mismatched_function_code() {
        let mut transport = ScriptedTransport::new();
        // Slave replies fc=4 (Read Input Registers) to an fc=3 request,
        // with a payload that would otherwise pass shape verification.
        let response = framer::build_rtu_frame(1, 0x04, &[0x02, 0x12, 0x34]);
        transport.push_response(&response);
        let engine = engine_with(transport);

        let result = engine.execute(1, FunctionCode::ReadHoldingRegisters, &[0x00, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(ModbusError::InvalidResponse { .. })));
    }
}
