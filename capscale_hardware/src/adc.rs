//! Packed ADC frame decoding.
//!
//! The acquisition buffer holds one 32-bit word per conversion. Channel 0 sits in
//! the low half-word and channel 1 in the high half-word, each as a 14-bit two's
//! complement value.

use crate::error::{HwError, Result};

/// Number of distinct 14-bit codes.
pub const CODE_SPAN: i32 = 16_384;
/// Half of the code span; the sign boundary.
pub const HALF_SPAN: i32 = 8_192;

const CODE_MASK: i32 = 0x3FFF;

/// Sign-extend one 14-bit half-word to counts.
#[inline]
pub fn decode_channel(half_word: u32) -> i32 {
    let v = (half_word % CODE_SPAN as u32) as i32;
    ((v - HALF_SPAN) & CODE_MASK) - HALF_SPAN
}

/// Encode counts for one channel. Fails when `counts` doesn't fit 14 bits.
#[inline]
pub fn encode_channel(counts: i32) -> Result<u32> {
    if !(-HALF_SPAN..HALF_SPAN).contains(&counts) {
        return Err(HwError::OutOfRange(i64::from(counts)));
    }
    Ok((counts & CODE_MASK) as u32)
}

/// Pack both channels into one frame word.
#[inline]
pub fn pack_word(ch0: i32, ch1: i32) -> Result<u32> {
    Ok(encode_channel(ch0)? | (encode_channel(ch1)? << 16))
}

/// Average the first `n_avg` words of a frame, per channel.
///
/// `n_avg` is clamped to `[1, frame.len()]`. Sums are accumulated in `i64` and
/// the mean is rounded half away from zero.
pub fn average_frame(frame: &[u32], n_avg: u32) -> Result<(i32, i32)> {
    if frame.is_empty() {
        return Err(HwError::EmptyFrame);
    }
    let count = (n_avg as usize).clamp(1, frame.len());
    let (acc0, acc1) = frame[..count]
        .iter()
        .fold((0_i64, 0_i64), |(a0, a1), &w| {
            (
                a0 + i64::from(decode_channel(w)),
                a1 + i64::from(decode_channel(w >> 16)),
            )
        });
    let n = count as f64;
    Ok((
        (acc0 as f64 / n).round() as i32,
        (acc1 as f64 / n).round() as i32,
    ))
}
