//! Subframe decoding: the per-channel coded data within a frame.
//!
//! Subframe types:
//! - CONSTANT: one value filling the whole block
//! - VERBATIM: uncompressed samples
//! - FIXED: fixed linear predictor (orders 0-4)
//! - LPC: linear predictive coding with transmitted coefficients (orders 1-32)
//!
//! Every subframe may strip "wasted bits" (trailing zero bits common to
//! all its samples) before prediction; they are shifted back in after
//! decoding. Residuals for the predictive types are Rice-coded in
//! partitions.

use crate::bitstream::BitInput;
use crate::error::{FlacError, FlacResult};
use crate::lpc::{restore_lpc, FIXED_PREDICTION_COEFFICIENTS};
use crate::source::ByteSource;

/// Subframe type, parsed from the 6-bit code in the subframe header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubframeType {
    /// All samples share one value
    Constant,
    /// Uncompressed samples
    Verbatim,
    /// Fixed predictor with the given order (0-4)
    Fixed(u8),
    /// LPC predictor with the given order (1-32)
    Lpc(u8),
}

impl SubframeType {
    /// Parse the 6-bit subframe type code.
    pub fn from_code(code: u8) -> FlacResult<Self> {
        match code {
            0b000000 => Ok(SubframeType::Constant),
            0b000001 => Ok(SubframeType::Verbatim),
            0b001000..=0b001100 => Ok(SubframeType::Fixed(code & 0x07)),
            0b100000..=0b111111 => Ok(SubframeType::Lpc((code & 0x1F) + 1)),
            _ => Err(FlacError::ReservedSubframeType(code)),
        }
    }

    /// The predictor order of this subframe type.
    pub const fn order(self) -> usize {
        match self {
            SubframeType::Constant | SubframeType::Verbatim => 0,
            SubframeType::Fixed(order) | SubframeType::Lpc(order) => order as usize,
        }
    }
}

/// Decode one subframe into `result[.. block_size]`.
///
/// `sample_depth` is the effective depth for this channel, which is one
/// more than the frame's declared depth for the side channel of a stereo
/// decorrelation mode; `result` therefore holds `i64`.
pub(crate) fn decode_subframe<S: ByteSource>(
    input: &mut BitInput<S>,
    sample_depth: u32,
    block_size: usize,
    result: &mut [i64],
) -> FlacResult<()> {
    debug_assert!((1..=33).contains(&sample_depth));
    debug_assert!(result.len() >= block_size);

    if input.read_uint(1)? != 0 {
        return Err(FlacError::InvalidPaddingBits);
    }
    let subframe_type = SubframeType::from_code(input.read_uint(6)? as u8)?;

    let mut wasted = 0u32;
    if input.read_uint(1)? == 1 {
        wasted = 1;
        loop {
            if wasted >= sample_depth {
                return Err(FlacError::ExcessiveWastedBits);
            }
            if input.read_uint(1)? == 1 {
                break;
            }
            wasted += 1;
        }
    }
    let sample_depth = sample_depth - wasted;

    match subframe_type {
        SubframeType::Constant => {
            let value = i64::from(input.read_signed_int(sample_depth)?);
            result[..block_size].fill(value);
        }
        SubframeType::Verbatim => {
            for slot in result[..block_size].iter_mut() {
                *slot = i64::from(input.read_signed_int(sample_depth)?);
            }
        }
        SubframeType::Fixed(order) => {
            decode_fixed_subframe(input, order as usize, sample_depth, block_size, result)?;
        }
        SubframeType::Lpc(order) => {
            decode_lpc_subframe(input, order as usize, sample_depth, block_size, result)?;
        }
    }

    if wasted > 0 {
        for slot in result[..block_size].iter_mut() {
            *slot <<= wasted;
        }
    }
    Ok(())
}

/// FIXED subframe: warm-up samples, residuals, then prediction with the
/// fixed coefficient table at shift 0.
fn decode_fixed_subframe<S: ByteSource>(
    input: &mut BitInput<S>,
    order: usize,
    sample_depth: u32,
    block_size: usize,
    result: &mut [i64],
) -> FlacResult<()> {
    if order > block_size {
        return Err(FlacError::PredictorOrderTooLarge {
            order: order as u8,
            block_size: block_size as u32,
        });
    }
    for slot in result[..order].iter_mut() {
        *slot = i64::from(input.read_signed_int(sample_depth)?);
    }
    read_residuals(input, order, block_size, result)?;
    restore_lpc(
        result,
        FIXED_PREDICTION_COEFFICIENTS[order],
        sample_depth,
        0,
        block_size,
    )
}

/// LPC subframe: warm-up samples, coefficient precision and shift, the
/// coefficients themselves, residuals, then prediction.
fn decode_lpc_subframe<S: ByteSource>(
    input: &mut BitInput<S>,
    order: usize,
    sample_depth: u32,
    block_size: usize,
    result: &mut [i64],
) -> FlacResult<()> {
    if order > block_size {
        return Err(FlacError::PredictorOrderTooLarge {
            order: order as u8,
            block_size: block_size as u32,
        });
    }
    for slot in result[..order].iter_mut() {
        *slot = i64::from(input.read_signed_int(sample_depth)?);
    }

    let precision = input.read_uint(4)? + 1;
    if precision == 16 {
        return Err(FlacError::InvalidQlpPrecision {
            precision: precision as u8,
        });
    }
    let shift = input.read_signed_int(5)?;
    if shift < 0 {
        return Err(FlacError::InvalidLpcShift {
            shift: shift as i8,
        });
    }

    let mut coefs = [0i32; 32];
    for coef in coefs[..order].iter_mut() {
        *coef = input.read_signed_int(precision)?;
    }

    read_residuals(input, order, block_size, result)?;
    restore_lpc(result, &coefs[..order], sample_depth, shift as u32, block_size)
}

/// Read the partitioned residuals into `result[warmup .. block_size]`.
///
/// A 2-bit method selects 4- or 5-bit Rice parameters; an all-ones
/// parameter escapes to fixed-width verbatim residuals. The block is split
/// into `2^partition_order` equal partitions, the first of which omits the
/// warm-up slots.
fn read_residuals<S: ByteSource>(
    input: &mut BitInput<S>,
    warmup: usize,
    block_size: usize,
    result: &mut [i64],
) -> FlacResult<()> {
    debug_assert!(warmup <= block_size);
    debug_assert!(result.len() >= block_size);

    let method = input.read_uint(2)?;
    if method >= 2 {
        return Err(FlacError::ReservedResidualMethod(method as u8));
    }
    let param_bits = if method == 0 { 4 } else { 5 };
    let escape_param = if method == 0 { 0xF } else { 0x1F };

    let partition_order = input.read_uint(4)?;
    let num_partitions = 1usize << partition_order;
    if block_size % num_partitions != 0 {
        return Err(FlacError::PartitionedBlockSize {
            block_size: block_size as u32,
            partitions: num_partitions as u32,
        });
    }
    let partition_size = block_size >> partition_order;
    if warmup > partition_size {
        return Err(FlacError::RicePartitionOverflow);
    }

    let mut result_index = warmup;
    let mut partition_end = partition_size;
    while partition_end <= block_size {
        let param = input.read_uint(param_bits)?;
        if param == escape_param {
            let num_bits = input.read_uint(5)?;
            while result_index < partition_end {
                result[result_index] = i64::from(input.read_signed_int(num_bits)?);
                result_index += 1;
            }
        } else {
            input.read_rice_signed_ints(param, result, result_index, partition_end)?;
            result_index = partition_end;
        }
        partition_end += partition_size;
    }
    Ok(())
}
