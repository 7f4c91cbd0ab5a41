//! Contrast stretching to 8 bits

use ndarray::Array2;

/// Lower bound on the stretch denominator
pub const STRETCH_EPSILON: f64 = 1e-6;

/// Percentile `q` (0-100) of the finite values, linear interpolation
///
/// Returns `None` when there are no finite values.
pub fn percentile<'a, I>(values: I, q: f64) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Linear stretch of `band` between its `low` and `high` percentiles to 0..=255
///
/// `clip((v - p_low) / max(eps, p_high - p_low), 0, 1) * 255`, rounded
/// half to even.
/// NaN pixels map to 0, as does every pixel of an all-NaN band.
pub fn percentile_stretch(band: &Array2<f64>, low: f64, high: f64) -> Array2<f64> {
    let (Some(p_low), Some(p_high)) = (percentile(band.iter(), low), percentile(band.iter(), high)) else {
        return Array2::zeros(band.dim());
    };
    let denominator = (p_high - p_low).max(STRETCH_EPSILON);

    band.mapv(|v| {
        if v.is_nan() {
            0.0
        } else {
            (((v - p_low) / denominator).clamp(0.0, 1.0) * 255.0).round_ties_even()
        }
    })
}

/// Linear stretch between the band minimum and maximum to 0..=255
///
/// A band whose range is below `STRETCH_EPSILON` maps to 0 everywhere.
pub fn min_max_stretch(band: &Array2<f64>) -> Array2<f64> {
    let (Some(min), Some(max)) = (percentile(band.iter(), 0.0), percentile(band.iter(), 100.0)) else {
        return Array2::zeros(band.dim());
    };
    if max - min < STRETCH_EPSILON {
        return Array2::zeros(band.dim());
    }
    band.mapv(|v| if v.is_nan() { 0.0 } else { ((v - min) / (max - min) * 255.0).round_ties_even() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values: Vec<f64> = (1..=5).map(|v| v as f64).collect();
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 25.0), Some(2.0));
        assert!((percentile(&values, 10.0).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[f64::NAN], 50.0), None);
    }

    #[test]
    fn test_stretch_spans_full_range() {
        let band = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64);
        let out = percentile_stretch(&band, 2.0, 98.0);
        assert_eq!(out.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
        assert_eq!(out.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 255.0);
    }

    #[test]
    fn test_constant_band_is_zero() {
        let out = percentile_stretch(&Array2::from_elem((3, 3), 42.0), 2.0, 98.0);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_nan_maps_to_zero() {
        let mut band = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as f64);
        band[[0, 0]] = f64::NAN;
        let out = percentile_stretch(&band, 2.0, 98.0);
        assert_eq!(out[[0, 0]], 0.0);
        assert!(percentile_stretch(&Array2::from_elem((2, 2), f64::NAN), 2.0, 98.0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_min_max_stretch() {
        let band = Array2::from_shape_vec((1, 3), vec![10.0, 15.0, 20.0]).unwrap();
        assert_eq!(min_max_stretch(&band).into_raw_vec_and_offset().0, vec![0.0, 128.0, 255.0]);
        assert!(min_max_stretch(&Array2::from_elem((2, 2), 3.0)).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_halfway_values_round_to_even() {
        let band = Array2::from_shape_vec((1, 4), vec![0.0, 1.0, 5.0, 510.0]).unwrap();
        // 1 and 5 land on 0.5 and 2.5
        let expected = vec![0.0, 0.0, 2.0, 255.0];
        assert_eq!(percentile_stretch(&band, 0.0, 100.0).into_raw_vec_and_offset().0, expected);
        assert_eq!(min_max_stretch(&band).into_raw_vec_and_offset().0, expected);
    }
}
