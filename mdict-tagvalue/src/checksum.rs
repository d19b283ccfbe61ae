/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Frame checksum.
//!
//! Every framed message ends with `10=NNN<SOH>`, where `NNN` is the byte sum
//! of everything before the trailer modulo 256, zero-padded to three digits.
//! Dictionary payloads are cached verbatim, so the checksum is what lets a
//! consumer tell a truncated payload from a complete one.

/// Length of the `10=NNN<SOH>` trailer in bytes.
pub const TRAILER_LEN: usize = 7;

/// Calculates the checksum of a frame prefix.
///
/// # Arguments
/// * `data` - The frame bytes preceding the `10=` trailer
///
/// # Example
/// ```
/// use mdict_tagvalue::calculate_checksum;
///
/// let data = b"8=MDICT.1.0\x019=5\x0135=R\x01";
/// let checksum = calculate_checksum(data);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Formats a checksum value as a 3-digit zero-padded string.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; 3] {
    [
        b'0' + (checksum / 100),
        b'0' + ((checksum / 10) % 10),
        b'0' + (checksum % 10),
    ]
}

/// Parses a 3-digit checksum string.
///
/// # Returns
/// `Some(checksum)` if valid, `None` otherwise.
#[inline]
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    let [d0, d1, d2] = <[u8; 3]>::try_from(bytes).ok()?;
    let mut value: u32 = 0;
    for d in [d0, d1, d2] {
        if !d.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(d - b'0');
    }
    u8::try_from(value).ok()
}
