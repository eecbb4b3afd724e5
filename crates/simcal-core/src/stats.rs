//! Small numeric helpers: trimmed mean and ordinary least squares.
//!
//! Wall-clock timings are noisy — the scheduler occasionally donates a
//! 10× outlier — so per-level averages use a 20% trimmed mean and the
//! latency fit is a plain OLS regression over the averaged points.

/// Ordinary least squares fit of `y` on `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Slope of the fitted line
    pub slope: f64,
    /// Intercept of the fitted line
    pub intercept: f64,
    /// Coefficient of determination, in `[0, 1]`
    pub r_squared: f64,
}

/// Mean after discarding the top and bottom `trim_pct` of samples.
///
/// Below 3 samples there is nothing sensible to trim, so the plain
/// mean is returned. Empty input returns 0.
#[must_use]
pub fn trimmed_mean(values: &[f64], trim_pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if values.len() < 3 {
        return values.iter().sum::<f64>() / values.len() as f64;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cut = (sorted.len() as f64 * trim_pct) as usize;
    let kept = if cut > 0 && sorted.len() > 2 * cut {
        &sorted[cut..sorted.len() - cut]
    } else {
        &sorted[..]
    };

    kept.iter().sum::<f64>() / kept.len() as f64
}

/// Least-squares fit of paired samples.
///
/// slope = (nΣxy − ΣxΣy) / (nΣx² − (Σx)²), intercept = (Σy − slope·Σx)/n.
///
/// Degenerate input (all x identical, or fewer than 2 points) yields
/// slope 0 and R² 0 with the intercept at the mean of `y` — reported,
/// never a panic. Callers decide whether a zero-R² fit is usable.
#[must_use]
pub fn linear_regression(x: &[f64], y: &[f64]) -> LinearFit {
    debug_assert_eq!(x.len(), y.len());

    let n = x.len().min(y.len()) as f64;
    if n < 1.0 {
        return LinearFit {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
        };
    }

    let sx: f64 = x.iter().sum();
    let sy: f64 = y.iter().sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sx2: f64 = x.iter().map(|a| a * a).sum();

    let denom = n * sx2 - sx * sx;
    if denom.abs() < 1e-15 {
        return LinearFit {
            slope: 0.0,
            intercept: sy / n,
            r_squared: 0.0,
        };
    }

    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;

    let y_mean = sy / n;
    let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();

    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}
