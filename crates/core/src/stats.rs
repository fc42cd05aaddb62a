//! Small numeric helpers: error function, normal CDF and sample statistics.

/// z-score of the 25th/75th percentile of a standard normal.
pub const QUARTILE_Z: f64 = 0.674;
/// z-score of the 10th/90th percentile of a standard normal.
pub const DECILE_Z: f64 = 1.2816;

/// Gauss error function, Abramowitz and Stegun formula 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

/// P(X <= x) for X ~ N(mean, std_dev). A non-positive deviation degenerates to a step.
pub fn normal_cdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 || !std_dev.is_finite() {
        return if x >= mean { 1.0 } else { 0.0 };
    }
    let z = (x - mean) / std_dev;
    (0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))).clamp(0.0, 1.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|value| (value - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Pearson correlation; zero when either series is constant or the lengths differ.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() {
        return 0.0;
    }
    let (Some(mean_x), Some(mean_y)) = (mean(xs), mean(ys)) else {
        return 0.0;
    };

    let mut numerator = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        numerator += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }

    let denominator = (denom_x * denom_y).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Rounds to `digits` decimal places.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::{correlation, erf, mean, normal_cdf, round_to, std_dev};

    #[test]
    fn erf_matches_reference_values() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(0.5) - 0.520_499_877_8).abs() < 2e-7);
        assert!((erf(1.0) - 0.842_700_792_9).abs() < 2e-7);
        assert!((erf(-1.0) + 0.842_700_792_9).abs() < 2e-7);
        assert!((erf(3.0) - 0.999_977_909_5).abs() < 2e-7);
    }

    #[test]
    fn normal_cdf_is_centered_and_monotone() {
        assert!((normal_cdf(0.86, 0.86, 0.015) - 0.5).abs() < 1e-7);
        assert!(normal_cdf(0.85, 0.86, 0.015) < normal_cdf(0.87, 0.86, 0.015));
        assert!((normal_cdf(1.96, 0.0, 1.0) - 0.975).abs() < 1e-3);
    }

    #[test]
    fn zero_deviation_degenerates_to_step() {
        assert_eq!(normal_cdf(0.9, 1.0, 0.0), 0.0);
        assert_eq!(normal_cdf(1.0, 1.0, 0.0), 1.0);
    }

    #[test]
    fn sample_statistics_use_population_deviation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&values), Some(2.5));
        assert!((std_dev(&values).unwrap_or_default() - 1.118_033_988_7).abs() < 1e-9);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn correlation_handles_degenerate_series() {
        assert!((correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-12);
        assert_eq!(correlation(&[1.0, 1.0], &[2.0, 3.0]), 0.0);
        assert_eq!(correlation(&[1.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn rounding_keeps_requested_digits() {
        assert_eq!(round_to(0.123_456, 3), 0.123);
        assert_eq!(round_to(1.000_49, 3), 1.0);
    }
}
