//! Horizontal differencing predictor (TIFF Predictor = 2)
//!
//! Differencing runs on whole sample words, so 16-, 32- and 64-bit samples
//! (float bit patterns included) are handled with wrapping integer
//! arithmetic in the container's byte order.

use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::{TiffError, TiffResult};

fn read_word(buf: &[u8], width: usize, order: ByteOrder) -> u64 {
    match width {
        1 => buf[0] as u64,
        2 => order.u16_from(buf) as u64,
        4 => order.u32_from(buf) as u64,
        _ => order.u64_from(buf),
    }
}

fn write_word(buf: &mut [u8], width: usize, value: u64, order: ByteOrder) {
    match width {
        1 => buf[0] = value as u8,
        2 => order.put_u16(buf, value as u16),
        4 => order.put_u32(buf, value as u32),
        _ => order.put_u64(buf, value),
    }
}

fn check_width(bytes_per_sample: usize) -> TiffResult<()> {
    match bytes_per_sample {
        1 | 2 | 4 | 8 => Ok(()),
        other => Err(TiffError::GenericError(format!(
            "Horizontal predictor cannot handle {}-byte samples", other))),
    }
}

/// Reverses horizontal differencing in place
///
/// # Arguments
/// * `data` - Decoded block, whole rows only
/// * `row_samples` - Pixels per row times samples per pixel
/// * `stride` - Samples per pixel within the block
/// * `bytes_per_sample` - Width of one sample word
pub fn undo_horizontal(
    data: &mut [u8],
    row_samples: usize,
    stride: usize,
    bytes_per_sample: usize,
    order: ByteOrder,
) -> TiffResult<()> {
    check_width(bytes_per_sample)?;
    let row_bytes = row_samples * bytes_per_sample;
    if row_bytes == 0 {
        return Ok(());
    }
    let mask = if bytes_per_sample == 8 { u64::MAX } else { (1u64 << (bytes_per_sample * 8)) - 1 };

    for row in data.chunks_exact_mut(row_bytes) {
        for i in stride..row_samples {
            let prev = read_word(&row[(i - stride) * bytes_per_sample..], bytes_per_sample, order);
            let cur = read_word(&row[i * bytes_per_sample..], bytes_per_sample, order);
            write_word(&mut row[i * bytes_per_sample..], bytes_per_sample, cur.wrapping_add(prev) & mask, order);
        }
    }
    Ok(())
}

/// Applies horizontal differencing in place; inverse of `undo_horizontal`
pub fn apply_horizontal(
    data: &mut [u8],
    row_samples: usize,
    stride: usize,
    bytes_per_sample: usize,
    order: ByteOrder,
) -> TiffResult<()> {
    check_width(bytes_per_sample)?;
    let row_bytes = row_samples * bytes_per_sample;
    if row_bytes == 0 {
        return Ok(());
    }
    let mask = if bytes_per_sample == 8 { u64::MAX } else { (1u64 << (bytes_per_sample * 8)) - 1 };

    for row in data.chunks_exact_mut(row_bytes) {
        // Back to front so each difference uses the original left neighbour
        for i in (stride..row_samples).rev() {
            let prev = read_word(&row[(i - stride) * bytes_per_sample..], bytes_per_sample, order);
            let cur = read_word(&row[i * bytes_per_sample..], bytes_per_sample, order);
            write_word(&mut row[i * bytes_per_sample..], bytes_per_sample, cur.wrapping_sub(prev) & mask, order);
        }
    }
    Ok(())
}
