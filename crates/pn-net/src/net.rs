//! Core network data structures.

use pn_core::{PoreId, Real, ThroatId};

/// An immutable pore/throat network.
///
/// The network stores:
/// - The unordered endpoint pair of every throat (`conns`).
/// - Compact adjacency: for each pore, which throats are incident.
/// - Optional pore centroid coordinates, opaque to the engines.
///
/// Parallel throats between the same pore pair are allowed (multigraph);
/// self-loops are rejected at build time. The structure is optimized for
/// the engines' traversal loops: everything is a flat, contiguous array.
#[derive(Debug, Clone)]
pub struct Network {
    pub(crate) pore_count: usize,
    pub(crate) conns: Vec<[PoreId; 2]>,

    /// Offsets for pore->throat adjacency: pore i's incident throats are in
    /// pore_throats[pore_throat_offsets[i]..pore_throat_offsets[i+1]].
    pub(crate) pore_throat_offsets: Vec<usize>,

    /// Flat list of throat IDs incident to pores (sorted by pore ID then
    /// throat ID for determinism).
    pub(crate) pore_throats: Vec<ThroatId>,

    /// Pore centroids, if supplied. Never read by the engines.
    pub(crate) coords: Option<Vec<[Real; 3]>>,
}

impl Network {
    /// Number of pores.
    pub fn pore_count(&self) -> usize {
        self.pore_count
    }

    /// Number of throats.
    pub fn throat_count(&self) -> usize {
        self.conns.len()
    }

    /// Endpoint pairs of all throats, indexed by throat index.
    pub fn conns(&self) -> &[[PoreId; 2]] {
        &self.conns
    }

    /// Endpoint pair of a throat (returns None if ID out of bounds).
    pub fn throat_conns(&self, t: ThroatId) -> Option<[PoreId; 2]> {
        self.conns.get(t.uindex()).copied()
    }

    /// Iterate over all throat IDs incident to a given pore.
    pub fn pore_throats(&self, pore: PoreId) -> &[ThroatId] {
        let idx = pore.uindex();
        if idx >= self.pore_count {
            return &[];
        }
        let start = self.pore_throat_offsets[idx];
        let end = self.pore_throat_offsets[idx + 1];
        &self.pore_throats[start..end]
    }

    /// The pore on the far side of `t` from `pore`.
    ///
    /// Returns None if `t` is out of bounds or `pore` is not an endpoint.
    pub fn other_end(&self, t: ThroatId, pore: PoreId) -> Option<PoreId> {
        let [a, b] = self.throat_conns(t)?;
        if a == pore {
            Some(b)
        } else if b == pore {
            Some(a)
        } else {
            None
        }
    }

    /// Whether `pore` names a pore of this network.
    pub fn contains_pore(&self, pore: PoreId) -> bool {
        pore.uindex() < self.pore_count
    }

    /// Whether `t` names a throat of this network.
    pub fn contains_throat(&self, t: ThroatId) -> bool {
        t.uindex() < self.conns.len()
    }

    /// Pore centroid coordinates, if they were supplied to the builder.
    pub fn coords(&self) -> Option<&[[Real; 3]]> {
        self.coords.as_deref()
    }
}
