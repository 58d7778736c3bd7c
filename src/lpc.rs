//! Inverse linear prediction.
//!
//! Both FIXED and LPC subframes reconstruct samples by adding each
//! residual to a weighted sum of earlier samples. The arithmetic is
//! exact in `i64`: samples are at most 33 bits (side channel), there are
//! at most 32 coefficients, and each coefficient fits in a signed 15-bit
//! value, so the accumulated sum stays within a signed 54-bit integer.
//! A residual that would push the restored sample outside its depth is a
//! data error, not a wrap.

use crate::error::{FlacError, FlacResult};

/// Coefficients of the fixed predictors, by order. The fixed predictors
/// are polynomial extrapolators; their transmitted shift is always 0.
pub(crate) const FIXED_PREDICTION_COEFFICIENTS: [&[i32]; 5] = [
    &[],
    &[1],
    &[2, -1],
    &[3, -3, 1],
    &[4, -6, 4, -1],
];

/// Restore `result[coefs.len() .. block_size]` in place: each slot holds
/// a residual on entry and the reconstructed sample on exit. `shift` is
/// applied to the prediction sum as an arithmetic right shift, rounding
/// toward negative infinity.
pub(crate) fn restore_lpc(
    result: &mut [i64],
    coefs: &[i32],
    sample_depth: u32,
    shift: u32,
    block_size: usize,
) -> FlacResult<()> {
    debug_assert!((1..=33).contains(&sample_depth));
    debug_assert!(shift <= 63);
    debug_assert!(result.len() >= block_size);

    let lower_bound = -1i64 << (sample_depth - 1);
    let upper_bound = -(lower_bound + 1);

    for i in coefs.len()..block_size {
        let mut sum: i64 = 0;
        for (j, &coef) in coefs.iter().enumerate() {
            sum += result[i - 1 - j] * i64::from(coef);
        }
        debug_assert!(sum >> 53 == 0 || sum >> 53 == -1);
        let sample = result[i] + (sum >> shift);
        if sample < lower_bound || sample > upper_bound {
            return Err(FlacError::PostLpcOverflow);
        }
        result[i] = sample;
    }
    Ok(())
}
