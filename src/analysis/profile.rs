//! One-dimensional profile helpers
//!
//! Row profiles are averaged intensities of a column band, one value per row.
//! Edges between calibration bands show up as strong negative steps in the
//! first difference of a profile; these helpers turn profiles into valleys.

/// First discrete difference, `out[i] = profile[i + 1] - profile[i]`
pub fn first_difference(profile: &[f64]) -> Vec<f64> {
    profile.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Zero every difference that is not a drop stronger than `diff_threshold`
pub fn suppress_weak_drops(diff: &mut [f64], diff_threshold: f64) {
    for value in diff.iter_mut() {
        if *value >= -diff_threshold {
            *value = 0.0;
        }
    }
}

/// Local maxima of `signal` with a height of at least `min_height`.
///
/// A maximum is a sample (or the middle of a flat plateau) strictly higher
/// than both neighbours. The first and last samples are never maxima. For a
/// plateau of even length the left-middle sample is reported.
pub fn find_peaks(signal: &[f64], min_height: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let peak = (i + ahead - 1) / 2;
                if signal[peak] >= min_height {
                    peaks.push(peak);
                }
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Valleys of a difference sequence: peaks of its negation
pub fn find_valleys(diff: &[f64], min_height: f64) -> Vec<usize> {
    let negated: Vec<f64> = diff.iter().map(|v| -v).collect();
    find_peaks(&negated, min_height)
}

/// Mean of the `n` largest values, 0.0 for an empty slice
pub fn top_n_mean(values: &[f64], n: usize) -> f64 {
    if values.is_empty() || n == 0 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let top = &sorted[..n.min(sorted.len())];
    top.iter().sum::<f64>() / top.len() as f64
}

/// Normalised left/right difference `|l - r| / ((l + r) / 2)`, 0.0 when both are 0
pub fn discontinuity_ratio(left: f64, right: f64) -> f64 {
    let mean = (left + right) / 2.0;
    if mean == 0.0 {
        return 0.0;
    }
    (left - right).abs() / mean
}
