//! pn-percolation: percolation engines over pore/throat networks.
//!
//! Provides:
//! - Union-find connectivity tracker
//! - Pressure-ordered invasion frontier
//! - Ordinary percolation (quasi-static pressure sweep)
//! - Invasion percolation (sequential frontier growth)
//! - Trapping post-processing of finished invasion runs
//! - Serializable result snapshots for export
//!
//! Engines borrow the network topology and the per-throat entry pressures
//! immutably; all mutable state (sequence numbers, cluster forests) is
//! private to a run, so independent runs on one network can proceed on
//! separate threads.
//!
//! # Example
//!
//! ```
//! use pn_net::NetworkBuilder;
//! use pn_percolation::{InvasionPercolation, StopCondition};
//!
//! let mut builder = NetworkBuilder::new();
//! let p0 = builder.add_pore();
//! let p1 = builder.add_pore();
//! builder.add_throat(p0, p1);
//! let net = builder.build().unwrap();
//!
//! let entry = [1.5];
//! let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
//! alg.set_inlets(&[p0]).unwrap();
//! alg.run(StopCondition::Complete).unwrap();
//!
//! assert_eq!(alg.pore_sequence().unwrap(), &[0, 1]);
//! assert_eq!(alg.throat_sequence().unwrap(), &[2]);
//! ```

pub mod clusters;
pub mod error;
pub mod frontier;
pub mod invasion;
pub mod ordinary;
pub mod report;
pub mod sweep;
pub mod trapping;

// Re-exports for public API
pub use clusters::DisjointSets;
pub use error::{PercResult, PercolationError};
pub use frontier::Frontier;
pub use invasion::{InvasionPercolation, StopCondition};
pub use ordinary::{OrdinaryPercolation, PercolationState};
pub use report::{CurvePoint, InvasionReport, PercolationCurve};
pub use sweep::{PressurePoints, Spacing};
pub use trapping::{TrappingOutcome, apply_trapping};

/// Sentinel for elements never invaded (and, in trapping arrays, never trapped).
pub const UNINVADED: i64 = -1;

use pn_core::{Real, ensure_finite};
use pn_net::Network;

/// Ingestion check shared by both engines: one finite, non-negative entry
/// pressure per throat. Checked once here, never in the traversal loops.
pub(crate) fn validate_entry_pressures(net: &Network, entry: &[Real]) -> PercResult<()> {
    if entry.len() != net.throat_count() {
        return Err(PercolationError::Config {
            what: format!(
                "entry pressure array has {} entries for {} throats",
                entry.len(),
                net.throat_count()
            ),
        });
    }
    for (i, &p) in entry.iter().enumerate() {
        ensure_finite(p, "entry pressure")?;
        if p < 0.0 {
            return Err(PercolationError::Config {
                what: format!("negative entry pressure {p} for throat {i}"),
            });
        }
    }
    Ok(())
}

/// Ingestion check for optional volume weights.
pub(crate) fn validate_volumes(net: &Network, pore: &[Real], throat: &[Real]) -> PercResult<()> {
    if pore.len() != net.pore_count() || throat.len() != net.throat_count() {
        return Err(PercolationError::Config {
            what: format!(
                "volume arrays ({} pores, {} throats) don't match the network ({}, {})",
                pore.len(),
                throat.len(),
                net.pore_count(),
                net.throat_count()
            ),
        });
    }
    for &v in pore.iter().chain(throat) {
        ensure_finite(v, "volume")?;
        if v < 0.0 {
            return Err(PercolationError::Config {
                what: format!("negative volume: {v}"),
            });
        }
    }
    if pore.iter().sum::<Real>() + throat.iter().sum::<Real>() <= 0.0 {
        return Err(PercolationError::Config {
            what: "total volume must be positive".into(),
        });
    }
    Ok(())
}
