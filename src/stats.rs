//! Small statistical helpers shared by the interval estimators
//!
//! Quantiles use Acklam's rational approximation of the inverse standard
//! normal CDF, with a Cornish-Fisher expansion on top for Student-t.

use crate::error::{FoldwiseError, Result};

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n-1 denominator). Returns 0.0 when n < 2.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Weighted mean with strictly positive weights.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

/// Linearized variance of a Horvitz-Thompson weighted mean:
/// sum(w_i^2 (v_i - mu)^2) / (sum w)^2.
pub fn weighted_mean_variance(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mu = weighted_mean(values, weights);
    values
        .iter()
        .zip(weights.iter())
        .map(|(v, w)| w * w * (v - mu).powi(2))
        .sum::<f64>()
        / (total * total)
}

/// Quantile of the standard normal distribution.
///
/// Fast paths for the common two-sided levels, Acklam's rational
/// approximation otherwise (relative error below 1.15e-9).
pub fn normal_quantile(p: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&p) || p == 0.0 || p == 1.0 {
        return Err(FoldwiseError::Computation(format!(
            "normal quantile undefined for p = {}",
            p
        )));
    }

    let z = if (p - 0.995).abs() < 1e-9 {
        2.575_829_303_549_0
    } else if (p - 0.975).abs() < 1e-9 {
        1.959_963_984_540_1
    } else if (p - 0.95).abs() < 1e-9 {
        1.644_853_626_951_5
    } else if (p - 0.5).abs() < 1e-9 {
        0.0
    } else {
        acklam_inverse_cdf(p)
    };

    Ok(z)
}

/// Quantile of the Student-t distribution with `df` degrees of freedom.
///
/// Cornish-Fisher expansion around the normal quantile (Abramowitz &
/// Stegun 26.7.5). Accurate to a few parts in a thousand for df >= 3,
/// which is sufficient for interval construction here.
pub fn t_quantile(p: f64, df: f64) -> Result<f64> {
    if df <= 0.0 {
        return Err(FoldwiseError::Computation(format!(
            "t quantile needs positive degrees of freedom, got {}",
            df
        )));
    }
    let z = normal_quantile(p)?;
    let z3 = z.powi(3);
    let z5 = z.powi(5);
    let z7 = z.powi(7);

    let g1 = (z3 + z) / 4.0;
    let g2 = (5.0 * z5 + 16.0 * z3 + 3.0 * z) / 96.0;
    let g3 = (3.0 * z7 + 19.0 * z5 + 17.0 * z3 - 15.0 * z) / 384.0;

    Ok(z + g1 / df + g2 / df.powi(2) + g3 / df.powi(3))
}

/// Rational approximation of the inverse standard normal CDF (Acklam).
fn acklam_inverse_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239e0,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838e0,
        -2.549_732_539_343_734e0,
        4.374_664_141_464_968e0,
        2.938_163_982_698_783e0,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996e0,
        3.754_408_661_907_416e0,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 0.97575;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
        let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
        num / den
    } else if p > P_HIGH {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        let num = ((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5];
        let den = (((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0;
        -(num / den)
    } else {
        let q = p - 0.5;
        let r = q * q;
        let num = (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q;
        let den = ((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0;
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((mean(&v) - 3.0).abs() < 1e-12);
        assert!((sample_variance(&v) - 2.5).abs() < 1e-12);
        assert_eq!(sample_variance(&[1.0]), 0.0);
    }

    #[test]
    fn test_weighted_mean_reduces_to_plain() {
        let v = [2.0, 4.0, 6.0];
        let w = [1.0, 1.0, 1.0];
        assert!((weighted_mean(&v, &w) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_quantile_known_values() {
        assert!((normal_quantile(0.975).unwrap() - 1.96).abs() < 1e-2);
        assert!((normal_quantile(0.95).unwrap() - 1.6449).abs() < 1e-3);
        // Symmetry
        let lo = normal_quantile(0.025).unwrap();
        let hi = normal_quantile(0.975).unwrap();
        assert!((lo + hi).abs() < 1e-6);
        assert!(normal_quantile(0.0).is_err());
        assert!(normal_quantile(1.0).is_err());
    }

    #[test]
    fn test_t_quantile_approaches_normal() {
        let t = t_quantile(0.975, 1e6).unwrap();
        assert!((t - 1.96).abs() < 1e-2);
        // t_{4, 0.975} = 2.776 (tabulated); the expansion lands close
        let t4 = t_quantile(0.975, 4.0).unwrap();
        assert!((t4 - 2.776).abs() < 0.05, "got {}", t4);
        // Heavier tails than normal for finite df
        assert!(t_quantile(0.975, 10.0).unwrap() > normal_quantile(0.975).unwrap());
    }
}
