//! Sample statistics over fact measures.
//!
//! Everything here is `f64`. Callers convert back with [`to_decimal`] before
//! a value enters a result row.

use retail_core::value::Value;
use rust_decimal::{
  Decimal,
  prelude::{FromPrimitive, ToPrimitive},
};

/// Pearson's correlation coefficient of paired observations.
///
/// `None` with fewer than two pairs or when either side has no variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
  if pairs.len() < 2 {
    return None;
  }
  let n = pairs.len() as f64;
  let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
  let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

  let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
  for &(x, y) in pairs {
    let (dx, dy) = (x - mean_x, y - mean_y);
    sxy += dx * dy;
    sxx += dx * dx;
    syy += dy * dy;
  }
  if sxx == 0.0 || syy == 0.0 {
    return None;
  }
  let r = sxy / (sxx * syy).sqrt();
  r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Result of a two-sample t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
  pub t:       f64,
  pub df:      f64,
  /// Two-sided.
  pub p_value: f64,
}

/// Student's two-sample t-test with pooled variance.
///
/// `None` when either sample has fewer than two observations or both are
/// constant.
pub fn student_t_test(a: &[f64], b: &[f64]) -> Option<TTest> {
  if a.len() < 2 || b.len() < 2 {
    return None;
  }
  let (na, nb) = (a.len() as f64, b.len() as f64);
  let (mean_a, mean_b) = (mean(a), mean(b));
  let df = na + nb - 2.0;
  let pooled = (sum_sq(a, mean_a) + sum_sq(b, mean_b)) / df;
  if pooled == 0.0 {
    return None;
  }
  let t = (mean_a - mean_b) / (pooled * (1.0 / na + 1.0 / nb)).sqrt();
  if !t.is_finite() {
    return None;
  }
  Some(TTest { t, df, p_value: two_sided_p(t, df) })
}

/// Round to `dp` places and move into the row value domain.
pub fn to_decimal(x: f64, dp: u32) -> Value {
  Decimal::from_f64(x).map(|d| d.round_dp(dp)).into()
}

/// A numeric cell as `f64`, if it has one.
pub fn to_f64(value: &Value) -> Option<f64> { value.as_decimal()?.to_f64() }

fn mean(xs: &[f64]) -> f64 { xs.iter().sum::<f64>() / xs.len() as f64 }

fn sum_sq(xs: &[f64], mean: f64) -> f64 {
  xs.iter().map(|x| (x - mean) * (x - mean)).sum()
}

// ─── Student's t distribution ────────────────────────────────────────────────

fn two_sided_p(t: f64, df: f64) -> f64 {
  incomplete_beta(df / 2.0, 0.5, df / (df + t * t)).clamp(0.0, 1.0)
}

/// Lanczos approximation of `ln Γ(x)` for `x > 0`.
fn ln_gamma(x: f64) -> f64 {
  const COEF: [f64; 6] = [
    76.180_091_729_471_46,
    -86.505_320_329_416_77,
    24.014_098_240_830_91,
    -1.231_739_572_450_155,
    0.120_865_097_386_617_9e-2,
    -0.539_523_938_495_3e-5,
  ];
  let mut tmp = x + 5.5;
  tmp -= (x + 0.5) * tmp.ln();
  let mut series = 1.000_000_000_190_015;
  let mut y = x;
  for c in COEF {
    y += 1.0;
    series += c / y;
  }
  -tmp + (2.506_628_274_631_000_5 * series / x).ln()
}

/// Regularised incomplete beta function `I_x(a, b)`.
fn incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
  if x <= 0.0 {
    return 0.0;
  }
  if x >= 1.0 {
    return 1.0;
  }
  let front = (ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b)
    + a * x.ln()
    + b * (1.0 - x).ln())
  .exp();
  if x < (a + 1.0) / (a + b + 2.0) {
    front * beta_fraction(a, b, x) / a
  } else {
    1.0 - front * beta_fraction(b, a, 1.0 - x) / b
  }
}

/// Continued fraction for [`incomplete_beta`], evaluated by Lentz's method.
fn beta_fraction(a: f64, b: f64, x: f64) -> f64 {
  const TINY: f64 = 1e-300;
  const EPS: f64 = 1e-14;
  let nudge = |v: f64| if v.abs() < TINY { TINY } else { v };

  let (qab, qap, qam) = (a + b, a + 1.0, a - 1.0);
  let mut c = 1.0;
  let mut d = 1.0 / nudge(1.0 - qab * x / qap);
  let mut h = d;
  for m in 1..=200 {
    let m = f64::from(m);
    let m2 = 2.0 * m;

    let even = m * (b - m) * x / ((qam + m2) * (a + m2));
    d = 1.0 / nudge(1.0 + even * d);
    c = nudge(1.0 + even / c);
    h *= d * c;

    let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
    d = 1.0 / nudge(1.0 + odd * d);
    c = nudge(1.0 + odd / c);
    let delta = d * c;
    h *= delta;
    if (delta - 1.0).abs() < EPS {
      break;
    }
  }
  h
}

#[cfg(test)]
mod tests {
  use super::*;

  fn close(a: f64, b: f64, tol: f64) -> bool { (a - b).abs() < tol }

  #[test]
  fn pearson_of_a_known_sample() {
    let pairs = [(1.0, 2.0), (2.0, 4.0), (3.0, 5.0), (4.0, 4.0), (5.0, 5.0)];
    let r = pearson(&pairs).unwrap();
    assert!(close(r, 0.774_596_669, 1e-9), "{r}");
  }

  #[test]
  fn perfect_lines_correlate_fully() {
    let up: Vec<_> = (0..10).map(|i| (f64::from(i), 3.0 * f64::from(i) + 1.0)).collect();
    let down: Vec<_> = (0..10).map(|i| (f64::from(i), -f64::from(i))).collect();
    assert!(close(pearson(&up).unwrap(), 1.0, 1e-12));
    assert!(close(pearson(&down).unwrap(), -1.0, 1e-12));
  }

  #[test]
  fn constant_side_has_no_correlation() {
    assert_eq!(pearson(&[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0)]), None);
    assert_eq!(pearson(&[(1.0, 1.0)]), None);
  }

  #[test]
  fn t_distribution_tail_probabilities() {
    assert!(close(two_sided_p(2.0, 10.0), 0.073_388, 1e-5));
    assert!(close(two_sided_p(2.228, 10.0), 0.050_01, 1e-4));
    assert!(close(two_sided_p(1.0, 1.0), 0.5, 1e-9));
    assert!(close(two_sided_p(0.0, 5.0), 1.0, 1e-12));
  }

  #[test]
  fn separated_samples_differ_significantly() {
    let test = student_t_test(&[10.0, 12.0, 14.0], &[20.0, 22.0, 24.0]).unwrap();
    assert!(close(test.t, -6.123_724, 1e-5), "{test:?}");
    assert!(close(test.df, 4.0, 1e-12));
    assert!(close(test.p_value, 0.003_602, 1e-5), "{test:?}");
  }

  #[test]
  fn undersized_or_constant_samples_are_not_tested() {
    assert_eq!(student_t_test(&[1.0], &[2.0, 3.0]), None);
    assert_eq!(student_t_test(&[4.0, 4.0], &[4.0, 4.0]), None);
  }

  #[test]
  fn decimal_conversion_rounds() {
    assert_eq!(to_decimal(0.123_456_7, 4), Value::Decimal(Decimal::new(1235, 4)));
    assert!(to_decimal(f64::NAN, 4).is_missing());
    assert_eq!(to_f64(&Value::Count(3)), Some(3.0));
    assert_eq!(to_f64(&Value::Missing), None);
  }
}
