//! Trend classification over a time series.
//!
//! The series is split in halves (`[..n/2]` and `[n/2..]`); the change is the
//! percentage difference between the half averages. A coefficient of
//! variation above the configured threshold overrides the direction with
//! `volatile` once the series has enough points.
//!
//! Forecast: `last * (1 + change/100)` with a band of
//! `last * (1 + (change ± band)/100)`. Confidence is 0.9 for ≥10 points,
//! 0.7 for ≥5, otherwise 0.5.

use covenant_core::config::TemporalConfig;
use covenant_core::models::{Forecast, TimeSeriesPoint, TrendDirection, TrendResult};

/// Summary statistics of a series (population variance).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    pub mean: f64,
    pub stddev: f64,
    /// stddev / |mean|, 0 when the mean is 0.
    pub coefficient_of_variation: f64,
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn stats(values: &[f64]) -> SeriesStats {
    if values.is_empty() {
        return SeriesStats {
            mean: 0.0,
            stddev: 0.0,
            coefficient_of_variation: 0.0,
        };
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let stddev = variance.sqrt();
    let coefficient_of_variation = if mean == 0.0 { 0.0 } else { stddev / mean.abs() };
    SeriesStats {
        mean,
        stddev,
        coefficient_of_variation,
    }
}

/// Strictly greater than `threshold` is increasing, strictly less than
/// `-threshold` is decreasing. The boundary itself is stable.
pub fn direction_for(change_percentage: f64, threshold: f64) -> TrendDirection {
    if change_percentage > threshold {
        TrendDirection::Increasing
    } else if change_percentage < -threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

pub fn confidence_for(points: usize) -> f64 {
    if points >= 10 {
        0.9
    } else if points >= 5 {
        0.7
    } else {
        0.5
    }
}

/// Pure classifier; holds only thresholds.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    config: TemporalConfig,
}

impl TrendClassifier {
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Quick classification at the ±`classify_threshold_pct` cut.
    pub fn classify(&self, points: &[TimeSeriesPoint]) -> TrendResult {
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        self.classify_values(&values)
    }

    pub fn classify_values(&self, values: &[f64]) -> TrendResult {
        self.evaluate(values, self.config.classify_threshold_pct)
    }

    /// Trend analysis at the wider ±`analysis_threshold_pct` cut, used by
    /// pattern detection.
    pub fn analyze_trend(&self, values: &[f64]) -> TrendResult {
        self.evaluate(values, self.config.analysis_threshold_pct)
    }

    fn evaluate(&self, values: &[f64], threshold: f64) -> TrendResult {
        let n = values.len();
        let last = values.last().copied().unwrap_or(0.0);

        if n < 2 {
            return TrendResult {
                direction: TrendDirection::Stable,
                change_percentage: 0.0,
                first_average: last,
                second_average: last,
                coefficient_of_variation: 0.0,
                data_points: n,
                forecast: self.forecast(last, 0.0, n),
            };
        }

        let (first, second) = values.split_at(n / 2);
        let first_average = mean(first);
        let second_average = mean(second);
        let change_percentage = if first_average == 0.0 {
            0.0
        } else {
            (second_average - first_average) / first_average * 100.0
        };

        let cv = stats(values).coefficient_of_variation;
        let direction = if n >= self.config.min_points_for_volatility
            && cv > self.config.volatility_cv_threshold
        {
            TrendDirection::Volatile
        } else {
            direction_for(change_percentage, threshold)
        };

        TrendResult {
            direction,
            change_percentage,
            first_average,
            second_average,
            coefficient_of_variation: cv,
            data_points: n,
            forecast: self.forecast(last, change_percentage, n),
        }
    }

    fn forecast(&self, last: f64, change_percentage: f64, points: usize) -> Forecast {
        let band = self.config.forecast_band_pct;
        let project = |pct: f64| last * (1.0 + pct / 100.0);
        let a = project(change_percentage - band);
        let b = project(change_percentage + band);
        Forecast {
            predicted_value: project(change_percentage),
            // A negative last value flips the band.
            lower_bound: a.min(b),
            upper_bound: a.max(b),
            confidence: confidence_for(points),
        }
    }
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self::new(TemporalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubling_series_is_increasing() {
        let result = TrendClassifier::default().classify_values(&[300.0, 600.0]);
        assert_eq!(result.direction, TrendDirection::Increasing);
        assert!((result.change_percentage - 100.0).abs() < 1e-9);
        assert!((result.forecast.predicted_value - 1200.0).abs() < 1e-9);
        assert_eq!(result.forecast.confidence, 0.5);
    }

    #[test]
    fn threshold_boundary_is_stable() {
        assert_eq!(direction_for(10.0, 10.0), TrendDirection::Stable);
        assert_eq!(direction_for(10.01, 10.0), TrendDirection::Increasing);
        assert_eq!(direction_for(-10.0, 10.0), TrendDirection::Stable);
        assert_eq!(direction_for(-10.01, 10.0), TrendDirection::Decreasing);
    }

    #[test]
    fn analysis_boundary_is_stable_at_fifteen() {
        let classifier = TrendClassifier::default();

        let at_cut = classifier.analyze_trend(&[100.0, 115.0]);
        assert_eq!(at_cut.change_percentage, 15.0);
        assert_eq!(at_cut.direction, TrendDirection::Stable);

        let above = classifier.analyze_trend(&[100.0, 115.01]);
        assert!(above.change_percentage > 15.0);
        assert_eq!(above.direction, TrendDirection::Increasing);

        let below = classifier.analyze_trend(&[100.0, 84.99]);
        assert_eq!(below.direction, TrendDirection::Decreasing);
        assert_eq!(classifier.analyze_trend(&[100.0, 85.0]).direction, TrendDirection::Stable);

        // The same series crosses the narrower classification cut.
        assert_eq!(classifier.classify_values(&[100.0, 115.0]).direction, TrendDirection::Increasing);
    }

    #[test]
    fn single_point_forecasts_last_value() {
        let result = TrendClassifier::default().classify_values(&[42.0]);
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.forecast.predicted_value, 42.0);
        assert_eq!(result.forecast.confidence, 0.5);
    }

    #[test]
    fn empty_series_is_stable_zero() {
        let result = TrendClassifier::default().classify_values(&[]);
        assert_eq!(result.direction, TrendDirection::Stable);
        assert_eq!(result.data_points, 0);
        assert_eq!(result.forecast.predicted_value, 0.0);
    }

    #[test]
    fn zero_first_half_yields_zero_change() {
        let result = TrendClassifier::default().classify_values(&[0.0, 0.0, 5.0, 5.0]);
        assert_eq!(result.change_percentage, 0.0);
    }

    #[test]
    fn stats_of_constant_series() {
        let s = stats(&[7.0, 7.0, 7.0]);
        assert_eq!(s.mean, 7.0);
        assert_eq!(s.stddev, 0.0);
        assert_eq!(s.coefficient_of_variation, 0.0);
    }
}
