//! Network validation logic.

use pn_core::{CoreResult, PoreId, Real, ThroatId};

use crate::error::NetError;

/// Validate the raw topology: all endpoint references exist, no self-loops,
/// coordinates (if any) cover every pore.
pub(crate) fn validate_structure(
    pore_count: usize,
    conns: &[[PoreId; 2]],
    coords: Option<&[[Real; 3]]>,
) -> CoreResult<()> {
    for (i, &[a, b]) in conns.iter().enumerate() {
        let throat = ThroatId::from_index(i as u32);
        for pore in [a, b] {
            if pore.uindex() >= pore_count {
                return Err(NetError::InvalidPoreRef { throat, pore }.into());
            }
        }
        if a == b {
            return Err(NetError::SelfLoop { throat, pore: a }.into());
        }
    }

    if let Some(coords) = coords {
        if coords.len() != pore_count {
            return Err(NetError::CoordsLenMismatch {
                expected: pore_count,
                actual: coords.len(),
            }
            .into());
        }
    }

    Ok(())
}

/// Validate adjacency lists for consistency.
pub(crate) fn validate_adjacency(
    pore_count: usize,
    conns: &[[PoreId; 2]],
    pore_throat_offsets: &[usize],
    pore_throats: &[ThroatId],
) -> CoreResult<()> {
    // Offsets array must have one entry per pore plus the terminator, and
    // the flat list holds each throat exactly twice (once per endpoint).
    if pore_throat_offsets.len() != pore_count + 1 || pore_throats.len() != conns.len() * 2 {
        return Err(NetError::InconsistentAdjacency {
            throat: ThroatId::from_index(0),
            pore: PoreId::from_index(0),
        }
        .into());
    }

    // Every listed throat must actually touch the pore it is listed under.
    let mut appearances = vec![0u8; conns.len()];
    for i in 0..pore_count {
        let pore = PoreId::from_index(i as u32);
        let start = pore_throat_offsets[i];
        let end = pore_throat_offsets[i + 1];

        for &throat in &pore_throats[start..end] {
            let Some(&[a, b]) = conns.get(throat.uindex()) else {
                return Err(NetError::InconsistentAdjacency { throat, pore }.into());
            };
            if a != pore && b != pore {
                return Err(NetError::InconsistentAdjacency { throat, pore }.into());
            }
            appearances[throat.uindex()] += 1;
        }
    }

    for (i, &n) in appearances.iter().enumerate() {
        if n != 2 {
            return Err(NetError::InconsistentAdjacency {
                throat: ThroatId::from_index(i as u32),
                pore: conns[i][0],
            }
            .into());
        }
    }

    Ok(())
}
