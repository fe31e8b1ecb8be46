//! Frame-check sequences for the two serial framing modes (§4.2).
//!
//! RTU frames are protected by CRC-16/Modbus (polynomial `0xA001`,
//! initial value `0xFFFF`, reflected, transmitted little-endian). ASCII
//! frames are protected by an LRC: the two's-complement of the sum of the
//! message bytes, modulo 256.

use std::sync::OnceLock;

const POLY: u16 = 0xA001;

/// Lazily-built 256-entry CRC-16/Modbus lookup table, one entry per
/// possible low byte of the running CRC.
fn table() -> &'static [u16; 256] {
    static TABLE: OnceLock<[u16; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u16; 256];
        let mut byte = 0usize;
        while byte < 256 {
            let mut crc = byte as u16;
            let mut bit = 0;
            while bit < 8 {
                if crc & 0x0001 != 0 {
                    crc = (crc >> 1) ^ POLY;
                } else {
                    crc >>= 1;
                }
                bit += 1;
            }
            table[byte] = crc;
            byte += 1;
        }
        table
    })
}

/// Compute the CRC-16/Modbus of `data`, starting from the standard
/// initial value `0xFFFF`.
pub fn crc16(data: &[u8]) -> u16 {
    update_crc16(0xFFFF, data)
}

/// Fold additional bytes into a running CRC-16/Modbus accumulator.
/// Callers that want to start a fresh computation should seed `crc` with
/// `0xFFFF`.
pub fn update_crc16(crc: u16, data: &[u8]) -> u16 {
    let table = table();
    let mut crc = crc;
    for &byte in data {
        let index = ((crc ^ u16::from(byte)) & 0x00FF) as usize;
        crc = (crc >> 8) ^ table[index];
    }
    crc
}

/// Serialize a CRC-16 value to its on-wire representation: low byte
/// first, then high byte.
pub fn crc16_to_bytes(crc: u16) -> [u8; 2] {
    [(crc & 0xFF) as u8, (crc >> 8) as u8]
}

/// Compute the Modbus ASCII LRC of `data`: the two's-complement of the
/// sum of all bytes, modulo 256.
pub fn lrc(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_known_vector() {
        // Read Holding Registers request, slave 17, start 0x006B, qty 3.
        let frame = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        let crc = crc16(&frame);
        assert_eq!(crc16_to_bytes(crc), [0x76, 0x87]);
    }

    #[test]
    fn test_crc16_empty_input() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn test_crc16_incremental_matches_bulk() {
        let data = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        let bulk = crc16(&data);
        let mut incremental = 0xFFFFu16;
        for chunk in data.chunks(2) {
            incremental = update_crc16(incremental, chunk);
        }
        assert_eq!(bulk, incremental);
    }

    #[test]
    fn test_lrc_known_vector() {
        // Read Holding Registers request, slave 17, start 0x006B, qty 3.
        let frame = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        assert_eq!(lrc(&frame), 0x7E);
    }

    #[test]
    fn test_lrc_self_checking() {
        let frame = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03];
        let check = lrc(&frame);
        let mut extended = frame.to_vec();
        extended.push(check);
        assert_eq!(lrc(&extended), 0);
    }
}
