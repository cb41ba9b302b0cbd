//! Trees-per-acre point estimate and its confidence bound.
//!
//! The reported `confidence_interval` is `mean + z * sd / sqrt(n)` over the
//! per-plot tree counts: the upper bound on the mean count per plot, not a
//! margin on the per-acre rate. Published reports carry this figure; a
//! ratio-estimator variance would give a different number.

use tracing::debug;

use crate::domain::entities::{
    AggregateMetrics, ConfidenceLevel, PlotObservation, StandIdentity, TpaReport,
};
use crate::domain::error::{DomainError, DomainResult};

// Acklam's rational approximation to the standard normal quantile.
const A: [f64; 6] = [
    -3.969683028665376e+01,
    2.209460984245205e+02,
    -2.759285104469687e+02,
    1.383577518672690e+02,
    -3.066479806614716e+01,
    2.506628277459239e+00,
];
const B: [f64; 5] = [
    -5.447609879822406e+01,
    1.615858368580409e+02,
    -1.556989798598866e+02,
    6.680131188771972e+01,
    -1.328068155288572e+01,
];
const C: [f64; 6] = [
    -7.784894002430293e-03,
    -3.223964580411365e-01,
    -2.400758277161838e+00,
    -2.549732539343734e+00,
    4.374664141464968e+00,
    2.938163982698783e+00,
];
const D: [f64; 4] = [
    7.784695709041462e-03,
    3.224671290700398e-01,
    2.445134137142996e+00,
    3.754408661907416e+00,
];
const P_LOW: f64 = 0.02425;

fn tail(q: f64) -> f64 {
    (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
        / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
}

/// Inverse CDF of the standard normal distribution, for `p` in (0, 1).
///
/// Relative error below 1.2e-9.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Two-sided z-score for a confidence level, e.g. 0.95 -> 1.95996.
pub fn z_score(level: ConfidenceLevel) -> f64 {
    inverse_normal_cdf(1.0 - (1.0 - level.value()) / 2.0)
}

/// Population standard deviation (denominator n). Zero for fewer than two values.
pub fn population_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Compute TPA and the upper confidence bound on mean trees per plot.
///
/// A single plot has zero variance, so the bound equals the plot's tree count.
pub fn estimate(
    stand: &StandIdentity,
    observations: &[PlotObservation],
    metrics: &AggregateMetrics,
    level: ConfidenceLevel,
) -> DomainResult<TpaReport> {
    if observations.is_empty() {
        return Err(DomainError::InsufficientData {
            stand: stand.clone(),
            reason: "no validation plots".to_string(),
        });
    }
    if !(metrics.total_validated_acres > 0.0) {
        return Err(DomainError::DivisionByZero {
            stand: stand.clone(),
            total_acres: metrics.total_validated_acres,
        });
    }

    let tpa = metrics.total_trees as f64 / metrics.total_validated_acres;

    let counts: Vec<f64> = observations.iter().map(|o| o.tree_count as f64).collect();
    let n = counts.len() as f64;
    let z = z_score(level);
    let stddev = population_stddev(&counts);
    let standard_error = stddev / n.sqrt();
    let confidence_interval = metrics.plot_tree_average + z * standard_error;

    debug!(
        "{}: tpa={:.4} z={:.5} sd={:.4} se={:.4} ci={:.4}",
        stand, tpa, z, stddev, standard_error, confidence_interval
    );

    Ok(TpaReport {
        tpa,
        confidence_interval,
        confidence_level: level.value(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn stand() -> StandIdentity {
        StandIdentity::new("c", "p", "s")
    }

    fn observations(plots: &[(f64, u64)]) -> Vec<PlotObservation> {
        plots
            .iter()
            .map(|&(validated_acres, tree_count)| PlotObservation {
                validated_acres,
                tree_count,
            })
            .collect()
    }

    #[rstest]
    #[case(0.975, 1.959_963_985)]
    #[case(0.995, 2.575_829_304)]
    #[case(0.95, 1.644_853_627)]
    #[case(0.5, 0.0)]
    #[case(0.01, -2.326_347_874)]
    fn given_probability_when_inverting_normal_cdf_then_matches_quantile(
        #[case] p: f64,
        #[case] expected: f64,
    ) {
        assert!((inverse_normal_cdf(p) - expected).abs() < 1e-7);
    }

    #[test]
    fn given_quantiles_when_mirrored_then_symmetric() {
        for p in [0.001, 0.01, 0.2, 0.4] {
            assert!((inverse_normal_cdf(p) + inverse_normal_cdf(1.0 - p)).abs() < 1e-8);
        }
    }

    #[test]
    fn given_values_when_population_stddev_then_uses_n_denominator() {
        let sd = population_stddev(&[10.0, 20.0, 15.0]);
        assert!((sd - 4.082_482_9).abs() < 1e-6);
        assert_eq!(population_stddev(&[7.0]), 0.0);
    }

    #[test]
    fn given_three_plots_when_estimating_then_matches_reference() {
        let obs = observations(&[(1.0, 10), (2.0, 20), (3.0, 15)]);
        let metrics = AggregateMetrics::from_observations(&stand(), &obs).unwrap();

        let report = estimate(&stand(), &obs, &metrics, ConfidenceLevel::default()).unwrap();

        assert_eq!(report.tpa, 7.5);
        assert!((report.confidence_interval - 19.619_679).abs() < 1e-5);
        assert_eq!(report.confidence_level, 0.95);
    }

    #[test]
    fn given_single_plot_when_estimating_then_bound_equals_mean() {
        let obs = observations(&[(0.5, 12)]);
        let metrics = AggregateMetrics::from_observations(&stand(), &obs).unwrap();

        let report = estimate(&stand(), &obs, &metrics, ConfidenceLevel::default()).unwrap();

        assert_eq!(report.confidence_interval, metrics.plot_tree_average);
        assert_eq!(report.tpa, 24.0);
    }

    #[test]
    fn given_zero_acreage_when_estimating_then_division_by_zero() {
        let obs = observations(&[(0.0, 3), (0.0, 4)]);
        let metrics = AggregateMetrics::from_observations(&stand(), &obs).unwrap();

        let err = estimate(&stand(), &obs, &metrics, ConfidenceLevel::default()).unwrap_err();

        assert!(matches!(err, DomainError::DivisionByZero { .. }));
        assert_eq!(err.stand(), Some(&stand()));
    }

    #[test]
    fn given_higher_confidence_when_estimating_then_bound_widens() {
        let obs = observations(&[(1.0, 10), (2.0, 20), (3.0, 15)]);
        let metrics = AggregateMetrics::from_observations(&stand(), &obs).unwrap();
        let level = |l| ConfidenceLevel::new(l).unwrap();

        let r95 = estimate(&stand(), &obs, &metrics, level(0.95)).unwrap();
        let r99 = estimate(&stand(), &obs, &metrics, level(0.99)).unwrap();

        assert_eq!(r95.tpa, r99.tpa);
        assert!(r99.confidence_interval > r95.confidence_interval);
        assert_eq!(r99.confidence_level, 0.99);
    }
}
