use serde::Serialize;

use super::Metric;
use crate::catalog::{round2, EnrichedTrackRecord};

/// Variances at or below this are treated as zero.
const VARIANCE_EPSILON: f64 = 1e-12;

/// Ordinary least squares fit `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    /// Pearson r, `None` when y is constant
    pub correlation: Option<f64>,
    pub r_squared: Option<f64>,
    /// Number of pairs the fit used
    pub n: usize,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fits a line through the pairs where both values are defined and finite.
///
/// Returns `None` for fewer than two usable pairs or when x does not vary.
pub fn fit_linear(x: &[Option<f64>], y: &[Option<f64>]) -> Option<LinearFit> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();

    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let count = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / count;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx / count <= VARIANCE_EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let correlation = (syy / count > VARIANCE_EPSILON)
        .then(|| (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0));

    Some(LinearFit {
        intercept,
        slope,
        correlation,
        r_squared: correlation.map(|r| r * r),
        n,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualRow {
    pub track_id: String,
    pub track_name: String,
    pub main_artist: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub predicted: Option<f64>,
    /// Observed minus predicted; positive rows beat the trend
    pub residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualAnalysis {
    pub x: Metric,
    pub y: Metric,
    pub fit: Option<LinearFit>,
    /// One row per input record, in input order
    pub rows: Vec<ResidualRow>,
}

impl ResidualAnalysis {
    /// Rows furthest above the fitted line, largest residual first.
    pub fn top_over(&self, k: usize) -> Vec<&ResidualRow> {
        let mut rows = self.defined_rows();
        rows.sort_by(|a, b| residual_of(b).total_cmp(&residual_of(a)));
        rows.truncate(k);
        rows
    }

    /// Rows furthest below the fitted line, most negative residual first.
    pub fn top_under(&self, k: usize) -> Vec<&ResidualRow> {
        let mut rows = self.defined_rows();
        rows.sort_by(|a, b| residual_of(a).total_cmp(&residual_of(b)));
        rows.truncate(k);
        rows
    }

    fn defined_rows(&self) -> Vec<&ResidualRow> {
        self.rows.iter().filter(|row| row.residual.is_some()).collect()
    }
}

fn residual_of(row: &ResidualRow) -> f64 {
    row.residual.unwrap_or(0.0)
}

/// Fits `y` against `x` over all records and reports each record's
/// prediction and residual, both rounded to two decimals.
pub fn residuals(records: &[EnrichedTrackRecord], x: Metric, y: Metric) -> ResidualAnalysis {
    let xs: Vec<Option<f64>> = records.iter().map(|r| x.value_of(r)).collect();
    let ys: Vec<Option<f64>> = records.iter().map(|r| y.value_of(r)).collect();
    let fit = fit_linear(&xs, &ys);

    let rows = records
        .iter()
        .zip(xs.iter().zip(&ys))
        .map(|(record, (&xv, &yv))| {
            let predicted = fit.zip(xv).map(|(fit, xv)| fit.predict(xv));
            let residual = predicted.zip(yv).map(|(p, yv)| round2(yv - p));
            ResidualRow {
                track_id: record.track_id().to_string(),
                track_name: record.track.name.clone(),
                main_artist: record.main_artist.clone(),
                x: xv,
                y: yv,
                predicted: predicted.map(round2),
                residual,
            }
        })
        .collect();

    ResidualAnalysis { x, y, fit, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::record;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_exact_line() {
        let x = [Some(0.0), Some(1.0), Some(2.0), Some(3.0)];
        let y = [Some(1.0), Some(3.0), Some(5.0), Some(7.0)];
        let fit = fit_linear(&x, &y).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.intercept, 1.0));
        assert!(close(fit.correlation.unwrap(), 1.0));
        assert!(close(fit.r_squared.unwrap(), 1.0));
        assert_eq!(fit.n, 4);
    }

    #[test]
    fn test_fit_negative_correlation() {
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        let y = [Some(90.0), Some(70.0), Some(60.0)];
        let fit = fit_linear(&x, &y).unwrap();
        assert!(fit.slope < 0.0);
        assert!(fit.correlation.unwrap() < -0.9);
    }

    #[test]
    fn test_fit_needs_two_points() {
        assert!(fit_linear(&[], &[]).is_none());
        assert!(fit_linear(&[Some(1.0)], &[Some(2.0)]).is_none());
        // second pair is unusable
        assert!(fit_linear(&[Some(1.0), None], &[Some(2.0), Some(3.0)]).is_none());
        assert!(fit_linear(&[Some(1.0), Some(f64::NAN)], &[Some(2.0), Some(3.0)]).is_none());
    }

    #[test]
    fn test_fit_constant_x_is_undefined() {
        let x = [Some(2.0), Some(2.0), Some(2.0)];
        let y = [Some(1.0), Some(5.0), Some(9.0)];
        assert!(fit_linear(&x, &y).is_none());
    }

    #[test]
    fn test_fit_constant_y_has_no_correlation() {
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        let y = [Some(50.0), Some(50.0), Some(50.0)];
        let fit = fit_linear(&x, &y).unwrap();
        assert!(close(fit.slope, 0.0));
        assert!(close(fit.intercept, 50.0));
        assert_eq!(fit.correlation, None);
        assert_eq!(fit.r_squared, None);
    }

    #[test]
    fn test_residuals_against_age() {
        // ages 1, 2, 3 with popularity 80, 60, 70: slope -5, intercept 80
        let records = vec![
            record("a", "IU", Some("2023-01-01"), Some(80)),
            record("b", "IU", Some("2022-01-01"), Some(60)),
            record("c", "IU", Some("2021-01-01"), Some(70)),
            record("d", "IU", None, Some(99)),
        ];

        let analysis = residuals(&records, Metric::AgeYears, Metric::Popularity);

        let fit = analysis.fit.unwrap();
        assert_eq!(fit.n, 3);
        assert!(close(fit.slope, -5.0));
        assert!(close(fit.intercept, 80.0));
        assert_eq!(analysis.rows[0].predicted, Some(75.0));
        assert_eq!(analysis.rows[0].residual, Some(5.0));
        assert_eq!(analysis.rows[1].residual, Some(-10.0));
        assert_eq!(analysis.rows[2].residual, Some(5.0));
        // no age, no prediction
        assert_eq!(analysis.rows[3].predicted, None);
        assert_eq!(analysis.rows[3].residual, None);
    }

    #[test]
    fn test_residuals_undefined_without_fit() {
        let records = vec![record("a", "IU", Some("2023-01-01"), Some(80))];
        let analysis = residuals(&records, Metric::AgeYears, Metric::Popularity);
        assert!(analysis.fit.is_none());
        assert_eq!(analysis.rows[0].predicted, None);
        assert_eq!(analysis.rows[0].residual, None);
    }

    #[test]
    fn test_top_over_and_under() {
        let records = vec![
            record("a", "IU", Some("2023-01-01"), Some(80)),
            record("b", "IU", Some("2022-01-01"), Some(60)),
            record("c", "IU", Some("2021-01-01"), Some(70)),
            record("d", "IU", None, Some(99)),
        ];
        let analysis = residuals(&records, Metric::AgeYears, Metric::Popularity);

        let over: Vec<_> = analysis.top_over(2).iter().map(|r| r.track_id.as_str()).collect();
        let under: Vec<_> = analysis.top_under(1).iter().map(|r| r.track_id.as_str()).collect();

        assert_eq!(over, vec!["a", "c"]);
        assert_eq!(under, vec!["b"]);
        assert_eq!(analysis.top_over(10).len(), 3);
    }
}
