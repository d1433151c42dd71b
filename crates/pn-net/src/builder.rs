//! Incremental network builder.

use pn_core::{CoreResult, PoreId, Real, ThroatId};

use crate::net::Network;
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Use `add_pore` and `add_throat` to build up the topology, then call
/// `build()` to validate and freeze it into an immutable `Network`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    pore_count: u32,
    conns: Vec<[PoreId; 2]>,
    coords: Option<Vec<[Real; 3]>>,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pore and return its ID.
    pub fn add_pore(&mut self) -> PoreId {
        let id = PoreId::from_index(self.pore_count);
        self.pore_count += 1;
        id
    }

    /// Add `n` pores at once, returning the ID of the first.
    pub fn add_pores(&mut self, n: u32) -> PoreId {
        let first = PoreId::from_index(self.pore_count);
        self.pore_count += n;
        first
    }

    /// Add a throat joining two pores and return its ID.
    ///
    /// Endpoint validity is checked in `build()`, not here.
    pub fn add_throat(&mut self, a: PoreId, b: PoreId) -> ThroatId {
        let id = ThroatId::from_index(self.conns.len() as u32);
        self.conns.push([a, b]);
        id
    }

    /// Attach pore centroid coordinates (one triple per pore).
    ///
    /// The length is checked against the pore count in `build()`.
    pub fn set_coords(&mut self, coords: Vec<[Real; 3]>) {
        self.coords = Some(coords);
    }

    /// Build and validate the network, returning an immutable `Network`.
    pub fn build(self) -> CoreResult<Network> {
        // First validate the raw topology
        validate::validate_structure(self.pore_count as usize, &self.conns, self.coords.as_deref())?;

        // Build adjacency lists: pore -> [throats]
        let (pore_throat_offsets, pore_throats) =
            Self::build_adjacency(self.pore_count as usize, &self.conns);

        // Validate adjacency consistency
        validate::validate_adjacency(
            self.pore_count as usize,
            &self.conns,
            &pore_throat_offsets,
            &pore_throats,
        )?;

        Ok(Network {
            pore_count: self.pore_count as usize,
            conns: self.conns,
            pore_throat_offsets,
            pore_throats,
            coords: self.coords,
        })
    }

    /// Build compact adjacency lists: for each pore, collect its incident throats.
    fn build_adjacency(pore_count: usize, conns: &[[PoreId; 2]]) -> (Vec<usize>, Vec<ThroatId>) {
        // Counting pass sizes each pore's slot
        let mut counts = vec![0usize; pore_count];
        for &[a, b] in conns {
            counts[a.uindex()] += 1;
            counts[b.uindex()] += 1;
        }

        let mut offsets = Vec::with_capacity(pore_count + 1);
        let mut running = 0usize;
        offsets.push(0);
        for &c in &counts {
            running += c;
            offsets.push(running);
        }

        // Fill pass; iterating throats in index order keeps each pore's list
        // sorted by throat ID.
        let mut cursor = offsets[..pore_count].to_vec();
        let mut flat = vec![ThroatId::from_index(0); conns.len() * 2];
        for (i, &[a, b]) in conns.iter().enumerate() {
            let t = ThroatId::from_index(i as u32);
            flat[cursor[a.uindex()]] = t;
            cursor[a.uindex()] += 1;
            flat[cursor[b.uindex()]] = t;
            cursor[b.uindex()] += 1;
        }

        (offsets, flat)
    }
}
