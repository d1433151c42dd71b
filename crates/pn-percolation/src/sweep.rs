//! Pressure point generation for quasi-static sweeps.

use pn_core::Real;

use crate::error::{PercResult, PercolationError};

/// Spacing of auto-generated pressure points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spacing {
    /// Uniformly spaced points
    Linear,
    /// Logarithmically spaced points
    Log,
}

/// Candidate invasion pressures for an ordinary percolation run.
#[derive(Debug, Clone)]
pub enum PressurePoints {
    /// Explicit list of pressures; sorted ascending before use.
    Explicit(Vec<Real>),
    /// `count` points spanning the entry-pressure range of the network.
    Sampled { count: usize, spacing: Spacing },
}

impl PressurePoints {
    /// Resolve into a sorted, finite list of pressures.
    ///
    /// Sampled points span `[min, max]` of `entry_pressures`. Log spacing
    /// falls back to linear when the range touches zero or negative values.
    pub fn resolve(&self, entry_pressures: &[Real]) -> PercResult<Vec<Real>> {
        match self {
            PressurePoints::Explicit(list) => {
                if list.is_empty() {
                    return Err(PercolationError::Config {
                        what: "explicit pressure list is empty".into(),
                    });
                }
                if let Some(&bad) = list.iter().find(|p| !p.is_finite()) {
                    return Err(PercolationError::Config {
                        what: format!("non-finite pressure point: {bad}"),
                    });
                }
                let mut sorted = list.clone();
                sorted.sort_by(Real::total_cmp);
                Ok(sorted)
            }
            PressurePoints::Sampled { count, spacing } => {
                if *count < 2 {
                    return Err(PercolationError::Config {
                        what: "sampled sweep must have at least 2 points".into(),
                    });
                }
                if entry_pressures.is_empty() {
                    return Err(PercolationError::Config {
                        what: "cannot sample pressure points of an empty network".into(),
                    });
                }
                let lo = entry_pressures.iter().copied().fold(Real::INFINITY, Real::min);
                let hi = entry_pressures
                    .iter()
                    .copied()
                    .fold(Real::NEG_INFINITY, Real::max);
                match spacing {
                    Spacing::Log if lo > 0.0 => Ok(log_points(lo, hi, *count)),
                    _ => Ok(linear_points(lo, hi, *count)),
                }
            }
        }
    }
}

fn linear_points(lo: Real, hi: Real, count: usize) -> Vec<Real> {
    let delta = (hi - lo) / (count - 1) as Real;
    let mut points: Vec<Real> = (0..count).map(|i| lo + i as Real * delta).collect();
    // Ensure exact endpoint
    points[count - 1] = hi;
    points
}

fn log_points(lo: Real, hi: Real, count: usize) -> Vec<Real> {
    let log_lo = lo.ln();
    let log_delta = (hi.ln() - log_lo) / (count - 1) as Real;
    let mut points: Vec<Real> = (0..count)
        .map(|i| (log_lo + i as Real * log_delta).exp())
        .collect();
    points[count - 1] = hi;
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_points_are_sorted() {
        let points = PressurePoints::Explicit(vec![3.0, 1.0, 2.0])
            .resolve(&[])
            .unwrap();
        assert_eq!(points, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn explicit_rejects_nan() {
        let result = PressurePoints::Explicit(vec![1.0, Real::NAN]).resolve(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn linear_sampling_spans_range() {
        let entry = [2.0, 10.0, 6.0];
        let points = PressurePoints::Sampled {
            count: 5,
            spacing: Spacing::Linear,
        }
        .resolve(&entry)
        .unwrap();
        assert_eq!(points, vec![2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn log_sampling_hits_endpoints() {
        let entry = [1.0, 100.0];
        let points = PressurePoints::Sampled {
            count: 3,
            spacing: Spacing::Log,
        }
        .resolve(&entry)
        .unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], 1.0);
        assert!((points[1] - 10.0).abs() < 1e-9);
        assert_eq!(points[2], 100.0);
    }

    #[test]
    fn log_sampling_falls_back_for_nonpositive_range() {
        let entry = [-1.0, 3.0];
        let points = PressurePoints::Sampled {
            count: 3,
            spacing: Spacing::Log,
        }
        .resolve(&entry)
        .unwrap();
        assert_eq!(points, vec![-1.0, 1.0, 3.0]);
    }

    #[test]
    fn sampling_requires_two_points() {
        let result = PressurePoints::Sampled {
            count: 1,
            spacing: Spacing::Linear,
        }
        .resolve(&[1.0]);
        assert!(result.is_err());
    }
}
