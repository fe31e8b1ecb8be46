//! Rendering a completed transaction as a human-readable or JSON trace.
//!
//! This is diagnostic tooling, not protocol logic: [`trace_exchange`] drives
//! a [`TransactionEngine`] exchange exactly as [`crate::instrument::Instrument`]
//! would, but also captures timing and outcome into an [`ExchangeRecord`]
//! that a [`TraceFormatter`] can render for a log line or a support bundle.

use std::time::{Duration, Instant};

use crate::engine::TransactionEngine;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::FunctionCode;

/// Outcome of one traced exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The exchange completed and the response validated.
    Success,
    /// The exchange failed; the message is `ModbusError`'s `Display` text.
    Error(String),
}

/// A record of one request/response exchange, suitable for rendering by a
/// [`TraceFormatter`]. Carries enough detail to reconstruct what was sent
/// and what came back without re-running the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRecord {
    /// Slave address the request was addressed to.
    pub slave: u8,
    /// Raw function code byte (unmasked).
    pub function_code: u8,
    /// Request payload passed to the transaction engine.
    pub request_payload: Vec<u8>,
    /// Response payload, if the exchange succeeded.
    pub response_payload: Option<Vec<u8>>,
    /// How the exchange concluded.
    pub outcome: ExchangeOutcome,
    /// Wall-clock time from the start of `execute` to its return.
    pub duration: Duration,
}

impl ExchangeRecord {
    /// Whether the exchange succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ExchangeOutcome::Success)
    }
}

/// Run one exchange via `engine.execute(..)`, timing it and capturing the
/// outcome into an [`ExchangeRecord`] alongside the `Result` a caller would
/// otherwise get directly from [`TransactionEngine::execute`].
pub fn trace_exchange<T: Transport>(
    engine: &TransactionEngine<T>,
    slave: u8,
    function_code: FunctionCode,
    payload: &[u8],
) -> (Result<Vec<u8>>, ExchangeRecord) {
    let start = Instant::now();
    let result = engine.execute(slave, function_code, payload);
    let duration = start.elapsed();

    let record = ExchangeRecord {
        slave,
        function_code: function_code.code(),
        request_payload: payload.to_vec(),
        response_payload: result.as_ref().ok().cloned(),
        outcome: match &result {
            Ok(_) => ExchangeOutcome::Success,
            Err(e) => ExchangeOutcome::Error(e.to_string()),
        },
        duration,
    };

    (result, record)
}

/// Renders an [`ExchangeRecord`] for a particular output medium.
///
/// Mirrors the trait-per-output-format shape of a payload formatter:
/// implementors provide the pieces, and `format_record` composes them into
/// the complete rendering.
pub trait TraceFormatter {
    /// Format the exchange header (slave, function code).
    fn format_header(&self, record: &ExchangeRecord) -> String;

    /// Format the request payload bytes.
    fn format_request(&self, record: &ExchangeRecord) -> String;

    /// Format the outcome: response payload on success, error message on
    /// failure.
    fn format_outcome(&self, record: &ExchangeRecord) -> String;

    /// Format the elapsed duration.
    fn format_timing(&self, record: &ExchangeRecord) -> String;

    /// Format the complete record. Default implementation concatenates
    /// the component outputs.
    fn format_record(&self, record: &ExchangeRecord) -> String {
        let mut out = self.format_header(record);
        out.push_str(&self.format_request(record));
        out.push_str(&self.format_outcome(record));
        out.push_str(&self.format_timing(record));
        out
    }
}

/// Human-readable, multi-line trace rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanTraceFormatter;

impl TraceFormatter for HumanTraceFormatter {
    fn format_header(&self, record: &ExchangeRecord) -> String {
        format!(
            "slave {} fc 0x{:02X}\n",
            record.slave, record.function_code
        )
    }

    fn format_request(&self, record: &ExchangeRecord) -> String {
        format!("  request:  {}\n", hex::encode_upper(&record.request_payload))
    }

    fn format_outcome(&self, record: &ExchangeRecord) -> String {
        match &record.outcome {
            ExchangeOutcome::Success => {
                let data = record
                    .response_payload
                    .as_deref()
                    .map(hex::encode_upper)
                    .unwrap_or_default();
                format!("  response: {data}\n")
            }
            ExchangeOutcome::Error(message) => format!("  error:    {message}\n"),
        }
    }

    fn format_timing(&self, record: &ExchangeRecord) -> String {
        format!("  duration: {:.3} ms\n", record.duration.as_secs_f64() * 1000.0)
    }
}

/// JSON trace rendering via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTraceFormatter;

impl TraceFormatter for JsonTraceFormatter {
    fn format_header(&self, _record: &ExchangeRecord) -> String {
        String::new() // handled wholesale in format_record
    }

    fn format_request(&self, _record: &ExchangeRecord) -> String {
        String::new()
    }

    fn format_outcome(&self, _record: &ExchangeRecord) -> String {
        String::new()
    }

    fn format_timing(&self, _record: &ExchangeRecord) -> String {
        String::new()
    }

    fn format_record(&self, record: &ExchangeRecord) -> String {
        #[derive(serde::Serialize)]
        struct Json<'a> {
            slave: u8,
            function_code: u8,
            request_payload: String,
            response_payload: Option<String>,
            success: bool,
            error: Option<&'a str>,
            duration_ms: f64,
        }

        let json = Json {
            slave: record.slave,
            function_code: record.function_code,
            request_payload: hex::encode_upper(&record.request_payload),
            response_payload: record.response_payload.as_deref().map(hex::encode_upper),
            success: record.is_success(),
            error: match &record.outcome {
                ExchangeOutcome::Success => None,
                ExchangeOutcome::Error(message) => Some(message.as_str()),
            },
            duration_ms: record.duration.as_secs_f64() * 1000.0,
        };

        serde_json::to_string(&json).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framer;
    use crate::transport::ScriptedTransport;
    use crate::types::{InstrumentSettings, SerialSettings};

    fn engine_with(transport: ScriptedTransport) -> TransactionEngine<ScriptedTransport> {
        TransactionEngine::new(transport, SerialSettings::new(115_200), InstrumentSettings::new())
    }

    #[test]
    fn test_trace_exchange_success() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let engine = engine_with(transport);

        let (result, record) = trace_exchange(
            &engine,
            1,
            FunctionCode::ReadHoldingRegisters,
            &[0x00, 0x00, 0x00, 0x01],
        );
        assert!(result.is_ok());
        assert!(record.is_success());
        assert_eq!(record.response_payload, Some(vec![0x02, 0x00, 0xBA]));
    }

    #[test]
    fn test_trace_exchange_failure() {
        let transport = ScriptedTransport::new();
        let engine = engine_with(transport);

        let (result, record) = trace_exchange(
            &engine,
            1,
            FunctionCode::ReadHoldingRegisters,
            &[0x00, 0x00, 0x00, 0x01],
        );
        assert!(result.is_err());
        assert!(!record.is_success());
        assert!(matches!(record.outcome, ExchangeOutcome::Error(_)));
    }

    #[test]
    fn test_human_formatter_contains_hex() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let engine = engine_with(transport);
        let (_, record) = trace_exchange(
            &engine,
            1,
            FunctionCode::ReadHoldingRegisters,
            &[0x00, 0x00, 0x00, 0x01],
        );

        let rendered = HumanTraceFormatter.format_record(&record);
        assert!(rendered.contains("slave 1"));
        assert!(rendered.contains("0200BA"));
    }

    #[test]
    fn test_json_formatter_is_valid_json() {
        let mut transport = ScriptedTransport::new();
        transport.push_response(&framer::build_rtu_frame(1, 0x03, &[0x02, 0x00, 0xBA]));
        let engine = engine_with(transport);
        let (_, record) = trace_exchange(
            &engine,
            1,
            FunctionCode::ReadHoldingRegisters,
            &[0x00, 0x00, 0x00, 0x01],
        );

        let rendered = JsonTraceFormatter.format_record(&record);
        assert!(rendered.contains("\"success\":true"));
        assert!(rendered.contains("\"slave\":1"));
    }
}
