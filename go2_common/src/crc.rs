//! CRC-32 integrity field for Go2 command frames.
//!
//! Bit-wise CRC-32 with polynomial `0x04C11DB7`, initial register
//! `0xFFFFFFFF`, MSB-first, no reflection and no final XOR. The input is a
//! sequence of 32-bit words, not bytes: on the wire the frame is read as
//! little-endian `u32`s and the last word (the CRC itself) is excluded.
//!
//! The motor firmware recomputes this value and drops frames that do not
//! match, so the bit order here must not change.

const POLYNOMIAL: u32 = 0x04C1_1DB7;
const INITIAL: u32 = 0xFFFF_FFFF;

/// Compute the CRC over a sequence of words.
#[inline]
pub fn crc32_core(words: &[u32]) -> u32 {
    words.iter().fold(INITIAL, |crc, &word| crc32_step(crc, word))
}

/// Compute the CRC over a byte buffer read as little-endian words.
///
/// The buffer length must be a whole number of words; a trailing partial
/// word is ignored.
pub fn crc32_bytes(buf: &[u8]) -> u32 {
    debug_assert!(
        buf.len() % 4 == 0,
        "CRC input of {} bytes is not word aligned",
        buf.len()
    );
    let mut crc = INITIAL;
    for chunk in buf.chunks_exact(4) {
        let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        crc = crc32_step(crc, word);
    }
    crc
}

/// Integrity value for a complete frame: every word except the trailing one.
pub fn frame_crc(frame: &[u8]) -> u32 {
    let body = frame.len().saturating_sub(4);
    crc32_bytes(&frame[..body - body % 4])
}

/// Check the trailing little-endian CRC word of a complete frame.
pub fn verify_frame(frame: &[u8]) -> bool {
    if frame.len() < 4 || frame.len() % 4 != 0 {
        return false;
    }
    let tail = &frame[frame.len() - 4..];
    let stored = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    stored == frame_crc(frame)
}

#[inline]
fn crc32_step(crc: u32, word: u32) -> u32 {
    let mut crc = crc;
    let mut xbit: u32 = 1 << 31;
    for _ in 0..32 {
        if crc & 0x8000_0000 != 0 {
            crc = (crc << 1) ^ POLYNOMIAL;
        } else {
            crc <<= 1;
        }
        if word & xbit != 0 {
            crc ^= POLYNOMIAL;
        }
        xbit >>= 1;
    }
    crc
}
