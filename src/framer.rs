//! Frame assembly and parsing for both serial framing modes (§4.3).
//!
//! A `Framer` turns `(slave address, function code, payload)` into the
//! bytes actually written to the wire, and turns bytes read back off the
//! wire into a validated `(slave address, function code, payload)` tuple
//! or a specific validation failure. RTU and ASCII share the same logical
//! shape; they differ only in framing (binary vs. hex-text) and checksum
//! (CRC-16 vs. LRC).

use crate::crc::{crc16, crc16_to_bytes, lrc};
use crate::error::{ModbusError, Result};
use crate::types::FunctionCode;

/// A successfully parsed response frame, before exception interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    /// Slave address echoed in the response.
    pub slave: u8,
    /// Raw function code byte, with the exception high bit still set if
    /// `is_exception` is `true`.
    pub function_code: u8,
    /// `true` if the high bit of the function code byte was set, meaning
    /// `payload` holds a single exception code byte rather than response
    /// data.
    pub is_exception: bool,
    /// The exchange's data: response data for a normal reply, or exactly
    /// one exception code byte for an exception reply.
    pub payload: Vec<u8>,
}

/// Build an RTU request frame: `slave | function_code | payload | CRC-lo | CRC-hi`.
pub fn build_rtu_frame(slave: u8, function_code: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(slave);
    frame.push(function_code);
    frame.extend_from_slice(payload);
    let crc = crc16(&frame);
    frame.extend_from_slice(&crc16_to_bytes(crc));
    frame
}

/// Parse an RTU response frame, validating length, slave address, and CRC.
///
/// `expected_slave` is the address the request was addressed to; a
/// mismatch is treated as an invalid response rather than silently
/// accepted, since a half-duplex bus may carry a stale reply from another
/// exchange. If `tolerate_trailing_byte` is set, a single trailing
/// `0xFE` byte beyond the CRC is discarded before validation (§9 Open
/// Question b).
pub fn parse_rtu_frame(
    bytes: &[u8],
    expected_slave: u8,
    tolerate_trailing_byte: bool,
) -> Result<ParsedFrame> {
    let mut bytes = bytes;
    if tolerate_trailing_byte {
        if let [rest @ .., 0xFE] = bytes {
            if rest.len() >= 4 {
                bytes = rest;
            }
        }
    }

    if bytes.len() < 4 {
        return Err(ModbusError::ShortResponse {
            expected: 4,
            actual: bytes.len(),
        });
    }

    let (body, crc_bytes) = bytes.split_at(bytes.len() - 2);
    let expected_crc = crc16(body);
    let actual_crc = [crc_bytes[0], crc_bytes[1]];
    if crc16_to_bytes(expected_crc) != actual_crc {
        return Err(ModbusError::ChecksumMismatch {
            expected: crc16_to_bytes(expected_crc).to_vec(),
            actual: actual_crc.to_vec(),
        });
    }

    let slave = body[0];
    if slave != expected_slave {
        return Err(ModbusError::InvalidResponse {
            message: format!(
                "response slave address {slave} does not match requested address {expected_slave}"
            ),
            bytes: bytes.to_vec(),
        });
    }

    let function_code = body[1];
    let is_exception = function_code & 0x80 != 0;
    Ok(ParsedFrame {
        slave,
        function_code,
        is_exception,
        payload: body[2..].to_vec(),
    })
}

/// Build an ASCII request frame: `:` + hex(`slave function_code payload LRC`) + `\r\n`.
pub fn build_ascii_frame(slave: u8, function_code: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 2);
    body.push(slave);
    body.push(function_code);
    body.extend_from_slice(payload);
    let check = lrc(&body);
    body.push(check);

    let mut frame = Vec::with_capacity(1 + body.len() * 2 + 2);
    frame.push(b':');
    frame.extend(hex::encode_upper(&body).into_bytes());
    frame.extend_from_slice(b"\r\n");
    frame
}

/// Parse an ASCII response frame, validating the `:` / CR-LF delimiters,
/// hex decoding, slave address, and LRC.
pub fn parse_ascii_frame(bytes: &[u8], expected_slave: u8) -> Result<ParsedFrame> {
    if bytes.first() != Some(&b':') {
        return Err(ModbusError::InvalidResponse {
            message: "ASCII frame does not start with ':'".into(),
            bytes: bytes.to_vec(),
        });
    }

    let end = memchr::memchr(b'\r', bytes).ok_or_else(|| ModbusError::InvalidResponse {
        message: "ASCII frame has no terminating CR".into(),
        bytes: bytes.to_vec(),
    })?;

    let hex_body = &bytes[1..end];
    let body = hex::decode(hex_body).map_err(|e| ModbusError::InvalidResponse {
        message: format!("ASCII frame body is not valid hex: {e}"),
        bytes: bytes.to_vec(),
    })?;

    if body.len() < 3 {
        return Err(ModbusError::ShortResponse {
            expected: 3,
            actual: body.len(),
        });
    }

    let (content, check_byte) = body.split_at(body.len() - 1);
    let expected_check = lrc(content);
    if expected_check != check_byte[0] {
        return Err(ModbusError::ChecksumMismatch {
            expected: vec![expected_check],
            actual: vec![check_byte[0]],
        });
    }

    let slave = content[0];
    if slave != expected_slave {
        return Err(ModbusError::InvalidResponse {
            message: format!(
                "response slave address {slave} does not match requested address {expected_slave}"
            ),
            bytes: bytes.to_vec(),
        });
    }

    let function_code = content[1];
    let is_exception = function_code & 0x80 != 0;
    Ok(ParsedFrame {
        slave,
        function_code,
        is_exception,
        payload: content[2..].to_vec(),
    })
}

/// Predict the total RTU response length, in bytes including CRC, for a
/// request built with `build_rtu_frame(.., function_code, request_payload)`.
///
/// This lets the transaction engine bound its read instead of blocking
/// indefinitely for a response a misbehaving slave never sends.
pub fn expected_rtu_response_len(function_code: FunctionCode, request_payload: &[u8]) -> usize {
    const HEADER_AND_CRC: usize = 1 + 1 + 2; // slave + function code + CRC

    if function_code.is_read() {
        let quantity = u16::from_be_bytes([request_payload[2], request_payload[3]]);
        let byte_count = match function_code {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                usize::from(quantity).div_ceil(8)
            }
            _ => usize::from(quantity) * 2,
        };
        HEADER_AND_CRC + 1 + byte_count
    } else {
        // Single writes echo address+value; multiple writes echo
        // address+quantity. Both are 4 payload bytes.
        HEADER_AND_CRC + 4
    }
}

/// Predict the total ASCII response length, in bytes including the `:`
/// prefix and `\r\n` suffix, for the same request shape as
/// [`expected_rtu_response_len`].
pub fn expected_ascii_response_len(function_code: FunctionCode, request_payload: &[u8]) -> usize {
    let rtu_len = expected_rtu_response_len(function_code, request_payload);
    // RTU body minus its 2-byte CRC, plus a 1-byte LRC, hex-doubled, plus
    // the ':' prefix and "\r\n" suffix.
    let body_len = rtu_len - 2 + 1;
    1 + body_len * 2 + 2
}

/// Unpack `count` bits from a fc1/fc2 response payload (byte count prefix
/// already stripped), tolerating set bits beyond `count` in the final
/// byte rather than treating them as a validation failure (§9 Open
/// Question a).
pub fn parse_bits_lenient(data: &[u8], count: usize) -> Result<Vec<bool>> {
    crate::codec::unpack_bits(data, count)
}
