//! Pure, side-effect-free conversions between typed domain values and raw
//! octet buffers (§4.1).
//!
//! Every operation here validates input ranges and fails with
//! [`ModbusError::ValueOutOfRange`] on violation; shape mismatches (wrong
//! buffer length, wrong bit-vector length) fail with
//! [`ModbusError::InvalidArgument`]. Multi-register values are marshalled
//! according to a [`ByteOrder`] tag; every 16-bit register on the wire is
//! still transmitted MSB-first regardless of that tag.

use byteorder::{BigEndian, ByteOrder as _, ReadBytesExt, WriteBytesExt};

use crate::error::{ModbusError, Result};
use crate::types::ByteOrder;

/// Encode an unsigned 16-bit register value as 2 big-endian octets.
pub fn encode_u16(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_u16(&mut buf, value);
    buf
}

/// Decode 2 big-endian octets as an unsigned 16-bit register value.
pub fn decode_u16(bytes: &[u8]) -> Result<u16> {
    require_len(bytes, 2)?;
    Ok((&bytes[..2]).read_u16::<BigEndian>().unwrap())
}

/// Encode a signed 16-bit register value (two's-complement) as 2
/// big-endian octets.
pub fn encode_i16(value: i16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    BigEndian::write_i16(&mut buf, value);
    buf
}

/// Decode 2 big-endian octets as a signed 16-bit register value.
pub fn decode_i16(bytes: &[u8]) -> Result<i16> {
    require_len(bytes, 2)?;
    Ok((&bytes[..2]).read_i16::<BigEndian>().unwrap())
}

/// Encode a 2-register boolean coil value: `0xFF00` for `true` (ON),
/// `0x0000` for `false` (OFF).
pub fn encode_bit(value: bool) -> [u8; 2] {
    if value {
        [0xFF, 0x00]
    } else {
        [0x00, 0x00]
    }
}

/// Decode a 2-octet coil value. Only `0x0000` and `0xFF00` are valid;
/// any other value is a protocol violation from the slave.
pub fn decode_bit(bytes: &[u8]) -> Result<bool> {
    require_len(bytes, 2)?;
    match (bytes[0], bytes[1]) {
        (0xFF, 0x00) => Ok(true),
        (0x00, 0x00) => Ok(false),
        _ => Err(ModbusError::InvalidResponse {
            message: "coil value is neither 0x0000 nor 0xFF00".into(),
            bytes: bytes.to_vec(),
        }),
    }
}

/// Reorder a logical big-endian byte sequence (`[A,B,C,D]` for 32-bit,
/// `[A..H]` for 64-bit) into the on-wire ordering selected by `order`.
fn apply_byte_order(logical_be: &[u8], order: ByteOrder) -> Vec<u8> {
    debug_assert!(logical_be.len() % 2 == 0);
    let registers: Vec<&[u8]> = logical_be.chunks(2).collect();
    match order {
        ByteOrder::Big => registers.concat(),
        ByteOrder::Little => registers.iter().rev().flat_map(|r| [r[1], r[0]]).collect(),
        ByteOrder::BigSwap => registers.iter().flat_map(|r| [r[1], r[0]]).collect(),
        ByteOrder::LittleSwap => registers
            .iter()
            .rev()
            .flat_map(|r| [r[0], r[1]])
            .collect(),
    }
}

/// Invert [`apply_byte_order`]: recover the logical big-endian byte
/// sequence from bytes received in the wire ordering selected by `order`.
fn undo_byte_order(wire_bytes: &[u8], order: ByteOrder) -> Vec<u8> {
    debug_assert!(wire_bytes.len() % 2 == 0);
    let registers: Vec<&[u8]> = wire_bytes.chunks(2).collect();
    match order {
        ByteOrder::Big => registers.concat(),
        ByteOrder::Little => registers.iter().rev().flat_map(|r| [r[1], r[0]]).collect(),
        ByteOrder::BigSwap => registers.iter().flat_map(|r| [r[1], r[0]]).collect(),
        ByteOrder::LittleSwap => registers
            .iter()
            .rev()
            .flat_map(|r| [r[0], r[1]])
            .collect(),
    }
}

/// Encode an unsigned 32-bit value across 2 registers per `order`.
pub fn encode_u32(value: u32, order: ByteOrder) -> Vec<u8> {
    let mut logical = [0u8; 4];
    BigEndian::write_u32(&mut logical, value);
    apply_byte_order(&logical, order)
}

/// Decode 4 octets (2 registers) as an unsigned 32-bit value per `order`.
pub fn decode_u32(bytes: &[u8], order: ByteOrder) -> Result<u32> {
    require_len(bytes, 4)?;
    let logical = undo_byte_order(&bytes[..4], order);
    Ok((&logical[..]).read_u32::<BigEndian>().unwrap())
}

/// Encode a signed 32-bit value across 2 registers per `order`.
pub fn encode_i32(value: i32, order: ByteOrder) -> Vec<u8> {
    let mut logical = [0u8; 4];
    BigEndian::write_i32(&mut logical, value);
    apply_byte_order(&logical, order)
}

/// Decode 4 octets (2 registers) as a signed 32-bit value per `order`.
pub fn decode_i32(bytes: &[u8], order: ByteOrder) -> Result<i32> {
    require_len(bytes, 4)?;
    let logical = undo_byte_order(&bytes[..4], order);
    Ok((&logical[..]).read_i32::<BigEndian>().unwrap())
}

/// Encode an unsigned 64-bit value across 4 registers per `order`.
pub fn encode_u64(value: u64, order: ByteOrder) -> Vec<u8> {
    let mut logical = [0u8; 8];
    BigEndian::write_u64(&mut logical, value);
    apply_byte_order(&logical, order)
}

/// Decode 8 octets (4 registers) as an unsigned 64-bit value per `order`.
pub fn decode_u64(bytes: &[u8], order: ByteOrder) -> Result<u64> {
    require_len(bytes, 8)?;
    let logical = undo_byte_order(&bytes[..8], order);
    Ok((&logical[..]).read_u64::<BigEndian>().unwrap())
}

/// Encode a signed 64-bit value across 4 registers per `order`.
pub fn encode_i64(value: i64, order: ByteOrder) -> Vec<u8> {
    let mut logical = [0u8; 8];
    BigEndian::write_i64(&mut logical, value);
    apply_byte_order(&logical, order)
}

/// Decode 8 octets (4 registers) as a signed 64-bit value per `order`.
pub fn decode_i64(bytes: &[u8], order: ByteOrder) -> Result<i64> {
    require_len(bytes, 8)?;
    let logical = undo_byte_order(&bytes[..8], order);
    Ok((&logical[..]).read_i64::<BigEndian>().unwrap())
}

/// Encode an IEEE-754 binary32 float across 2 registers per `order`.
///
/// Returns [`ModbusError::InvalidArgument`] if `value` is not finite.
pub fn encode_f32(value: f32, order: ByteOrder) -> Result<Vec<u8>> {
    if !value.is_finite() {
        return Err(ModbusError::invalid_argument(format!(
            "cannot encode non-finite f32 value: {value}"
        )));
    }
    let mut logical = [0u8; 4];
    BigEndian::write_f32(&mut logical, value);
    Ok(apply_byte_order(&logical, order))
}

/// Decode 4 octets (2 registers) as an IEEE-754 binary32 float per `order`.
pub fn decode_f32(bytes: &[u8], order: ByteOrder) -> Result<f32> {
    require_len(bytes, 4)?;
    let logical = undo_byte_order(&bytes[..4], order);
    Ok((&logical[..]).read_f32::<BigEndian>().unwrap())
}

/// Encode an IEEE-754 binary64 float across 4 registers per `order`.
///
/// Returns [`ModbusError::InvalidArgument`] if `value` is not finite.
pub fn encode_f64(value: f64, order: ByteOrder) -> Result<Vec<u8>> {
    if !value.is_finite() {
        return Err(ModbusError::invalid_argument(format!(
            "cannot encode non-finite f64 value: {value}"
        )));
    }
    let mut logical = [0u8; 8];
    BigEndian::write_f64(&mut logical, value);
    Ok(apply_byte_order(&logical, order))
}

/// Decode 8 octets (4 registers) as an IEEE-754 binary64 float per `order`.
pub fn decode_f64(bytes: &[u8], order: ByteOrder) -> Result<f64> {
    require_len(bytes, 8)?;
    let logical = undo_byte_order(&bytes[..8], order);
    Ok((&logical[..]).read_f64::<BigEndian>().unwrap())
}

/// Encode `text` into exactly `num_registers * 2` octets, right-padded
/// with spaces (`0x20`). Fails with [`ModbusError::InvalidArgument`] if
/// `text` is longer than the register span allows.
///
/// Operates on raw bytes, the domain minimalmodbus itself targets (Latin-1
/// register text); a byte sequence with the high bit set is accepted as
/// opaque bytes rather than rejected as invalid Unicode.
pub fn encode_string(text: &[u8], num_registers: u16) -> Result<Vec<u8>> {
    let capacity = usize::from(num_registers) * 2;
    if text.len() > capacity {
        return Err(ModbusError::invalid_argument(format!(
            "text of {} bytes does not fit in {num_registers} registers ({capacity} bytes)",
            text.len()
        )));
    }
    let mut buf = text.to_vec();
    buf.resize(capacity, b' ');
    Ok(buf)
}

/// Decode `2 * num_registers` octets as raw text bytes. No trimming of
/// padding is performed; the caller decides whether trailing spaces are
/// significant.
pub fn decode_string(bytes: &[u8], num_registers: u16) -> Result<Vec<u8>> {
    let expected = usize::from(num_registers) * 2;
    require_len(bytes, expected)?;
    Ok(bytes[..expected].to_vec())
}

/// Pack a sequence of booleans into `ceil(n/8)` octets, LSB-first within
/// each octet (bit 0 of the first octet is the first coil/input).
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            out[i / 8] |= 1 << (i % 8);
        }
    }
    out
}

/// Unpack `count` bits from `bytes`, LSB-first within each octet. Fails
/// with [`ModbusError::InvalidArgument`] if `bytes` is shorter than
/// `ceil(count/8)` octets.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Result<Vec<bool>> {
    let needed = count.div_ceil(8);
    require_len(bytes, needed)?;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let byte = bytes[i / 8];
        out.push((byte >> (i % 8)) & 1 == 1);
    }
    Ok(out)
}

/// Round `number * 10^decimals` to the nearest integer and encode it as an
/// unsigned 16-bit register, per §4.1's `scale_to_register`.
///
/// Fails with [`ModbusError::ValueOutOfRange`] if the scaled value does not
/// fit in `[0, 65535]`.
pub fn scale_to_register_u16(number: f64, decimals: u32) -> Result<u16> {
    let scaled = (number * 10f64.powi(decimals as i32)).round();
    if !(0.0..=65535.0).contains(&scaled) {
        return Err(ModbusError::out_of_range(
            format!("scaled value {scaled} does not fit in an unsigned 16-bit register"),
            scaled as i64,
        ));
    }
    Ok(scaled as u16)
}

/// Round `number * 10^decimals` to the nearest integer and encode it as a
/// signed 16-bit register, per §4.1's `scale_to_register`.
///
/// Fails with [`ModbusError::ValueOutOfRange`] if the scaled value does not
/// fit in `[-32768, 32767]`.
pub fn scale_to_register_i16(number: f64, decimals: u32) -> Result<i16> {
    let scaled = (number * 10f64.powi(decimals as i32)).round();
    if !(-32768.0..=32767.0).contains(&scaled) {
        return Err(ModbusError::out_of_range(
            format!("scaled value {scaled} does not fit in a signed 16-bit register"),
            scaled as i64,
        ));
    }
    Ok(scaled as i16)
}

/// Divide an unsigned register value by `10^decimals`, per §4.1's
/// `scale_from_register`.
pub fn scale_from_register_u16(value: u16, decimals: u32) -> f64 {
    f64::from(value) / 10f64.powi(decimals as i32)
}

/// Divide a signed register value by `10^decimals`, per §4.1's
/// `scale_from_register`.
pub fn scale_from_register_i16(value: i16, decimals: u32) -> f64 {
    f64::from(value) / 10f64.powi(decimals as i32)
}

fn require_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() < expected {
        return Err(ModbusError::invalid_argument(format!(
            "expected at least {expected} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}
