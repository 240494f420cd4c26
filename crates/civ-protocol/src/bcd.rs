//! Binary-coded decimal helpers
//!
//! CI-V radios decode BCD directly: every nibble carries one decimal digit.
//! There is no checksum on the wire, so a transposed nibble is silently
//! accepted by the radio as a different value. All packing here must match
//! the radio's digit order exactly.
//!
//! Three layouts are in use:
//! - **Frequencies**: little-endian, two digits per byte, low nibble is the
//!   less significant digit. 14.230 MHz = `00 00 23 14 00`.
//! - **Levels**: tens/units pair in the first byte, hundreds digit in the
//!   second. Level 128 = `28 01`.
//! - **Counters**: big-endian fixed-width BCD. Channel 123 = `01 23`.
//! - **Signed offsets**: little-endian digits with the sign in the top bit of
//!   the last byte. -150 Hz (4 digits) = `50 01 80`.

use crate::error::ParseError;

/// Standard width of a CI-V frequency field in bytes (10 digits)
pub const FREQUENCY_BYTES: usize = 5;

/// Widest frequency field any supported radio uses (12 digits, SHF rigs)
pub const MAX_FREQUENCY_BYTES: usize = 6;

/// Sign flag carried in the top bit of the last byte of a signed offset
pub const OFFSET_SIGN_BIT: u8 = 0x80;

/// Widest signed offset that fits an `i64` (18 digits)
const MAX_OFFSET_BYTES: usize = 9;

/// Widest big-endian field that fits a `u32` (8 digits)
const MAX_BE_BYTES: usize = 4;

/// Encode a frequency in Hz as 5 bytes of little-endian BCD
///
/// Digits above the tenth are dropped.
pub fn encode_frequency(hz: u64) -> [u8; FREQUENCY_BYTES] {
    let mut result = [0u8; FREQUENCY_BYTES];
    pack_le(hz, &mut result);
    result
}

/// Encode a frequency in Hz as `width` bytes of little-endian BCD
pub fn encode_frequency_width(hz: u64, width: usize) -> Vec<u8> {
    let mut result = vec![0u8; width];
    pack_le(hz, &mut result);
    result
}

/// Highest frequency a `width`-byte field can carry
pub fn max_frequency_for_width(width: usize) -> u64 {
    10u64.pow(2 * width.min(MAX_FREQUENCY_BYTES) as u32) - 1
}

/// Decode a little-endian BCD frequency field
///
/// Accepts the 4-byte fields of older radios as well as the standard
/// 5-byte and extended 6-byte fields.
pub fn decode_frequency(bytes: &[u8]) -> Result<u64, ParseError> {
    if bytes.is_empty() || bytes.len() > MAX_FREQUENCY_BYTES {
        return Err(ParseError::UnexpectedLength {
            what: "frequency",
            expected: FREQUENCY_BYTES,
            actual: bytes.len(),
        });
    }

    let mut freq: u64 = 0;
    let mut multiplier: u64 = 1;

    for &byte in bytes {
        let (hi, lo) = split_digits(byte)?;
        freq += lo as u64 * multiplier;
        multiplier *= 10;
        freq += hi as u64 * multiplier;
        multiplier *= 10;
    }

    Ok(freq)
}

/// Encode a 0-255 level as two bytes of BCD
///
/// Byte 0 holds the tens/units pair and byte 1 the hundreds digit, so level
/// 128 encodes as `[0x28, 0x01]`.
pub fn encode_level(value: u8) -> [u8; 2] {
    let hundreds = value / 100;
    let tens = (value / 10) % 10;
    let units = value % 10;
    [(tens << 4) | units, hundreds]
}

/// Decode a two-byte BCD level back to 0-255
pub fn decode_level(bytes: &[u8]) -> Result<u8, ParseError> {
    if bytes.len() != 2 {
        return Err(ParseError::UnexpectedLength {
            what: "level",
            expected: 2,
            actual: bytes.len(),
        });
    }

    let (tens, units) = split_digits(bytes[0])?;
    let (high, hundreds) = split_digits(bytes[1])?;
    if high != 0 {
        return Err(ParseError::InvalidBcd(bytes[1]));
    }

    let value = hundreds as u16 * 100 + tens as u16 * 10 + units as u16;
    u8::try_from(value).map_err(|_| ParseError::InvalidBcd(bytes[1]))
}

/// Encode a signed offset as little-endian BCD with a trailing sign flag
///
/// The result is `max_digits / 2 + 1` bytes long, so the top nibble of the
/// last byte never carries a digit and its top bit is free for the sign.
/// Magnitudes wider than `max_digits` lose their high digits; callers
/// validate the range first. Zero always encodes without the sign bit.
pub fn encode_signed_offset(hz: i64, max_digits: usize) -> Vec<u8> {
    let len = max_digits / 2 + 1;
    let mut result = vec![0u8; len];
    let mut magnitude = hz.unsigned_abs();

    for i in 0..max_digits {
        let digit = (magnitude % 10) as u8;
        magnitude /= 10;
        if i % 2 == 0 {
            result[i / 2] |= digit;
        } else {
            result[i / 2] |= digit << 4;
        }
    }

    let is_zero = result.iter().all(|&b| b == 0);
    if hz < 0 && !is_zero {
        result[len - 1] |= OFFSET_SIGN_BIT;
    }

    result
}

/// Decode a signed offset produced by [`encode_signed_offset`]
pub fn decode_signed_offset(bytes: &[u8]) -> Result<i64, ParseError> {
    if bytes.len() > MAX_OFFSET_BYTES {
        return Err(ParseError::UnexpectedLength {
            what: "signed offset",
            expected: MAX_OFFSET_BYTES,
            actual: bytes.len(),
        });
    }
    let Some((&last, rest)) = bytes.split_last() else {
        return Err(ParseError::UnexpectedLength {
            what: "signed offset",
            expected: 1,
            actual: 0,
        });
    };

    let negative = last & OFFSET_SIGN_BIT != 0;
    let last_digits = last & !OFFSET_SIGN_BIT;
    let mut magnitude: i64 = 0;
    let mut multiplier: i64 = 1;

    for &byte in rest.iter().chain(std::iter::once(&last_digits)) {
        let (hi, lo) = split_digits(byte)?;
        magnitude += lo as i64 * multiplier;
        multiplier *= 10;
        magnitude += hi as i64 * multiplier;
        multiplier *= 10;
    }

    Ok(if negative { -magnitude } else { magnitude })
}

/// Encode `value` as big-endian BCD using `digits` digits (rounded up to even)
pub fn encode_bcd_be(value: u32, digits: usize) -> Vec<u8> {
    let len = digits.div_ceil(2);
    let mut result = vec![0u8; len];
    let mut remaining = value;

    for byte in result.iter_mut().rev() {
        let lo = (remaining % 10) as u8;
        remaining /= 10;
        let hi = (remaining % 10) as u8;
        remaining /= 10;
        *byte = (hi << 4) | lo;
    }

    result
}

/// Decode big-endian BCD of up to 8 digits
pub fn decode_bcd_be(bytes: &[u8]) -> Result<u32, ParseError> {
    if bytes.len() > MAX_BE_BYTES {
        return Err(ParseError::UnexpectedLength {
            what: "BCD field",
            expected: MAX_BE_BYTES,
            actual: bytes.len(),
        });
    }

    let mut value: u32 = 0;
    for &byte in bytes {
        let (hi, lo) = split_digits(byte)?;
        value = value * 100 + hi as u32 * 10 + lo as u32;
    }
    Ok(value)
}

fn pack_le(value: u64, out: &mut [u8]) {
    let mut remaining = value;
    for byte in out.iter_mut() {
        let lo = (remaining % 10) as u8;
        remaining /= 10;
        let hi = (remaining % 10) as u8;
        remaining /= 10;
        *byte = (hi << 4) | lo;
    }
}

fn split_digits(byte: u8) -> Result<(u8, u8), ParseError> {
    let hi = byte >> 4;
    let lo = byte & 0x0F;
    if hi > 9 || lo > 9 {
        return Err(ParseError::InvalidBcd(byte));
    }
    Ok((hi, lo))
}
