//! Trapping post-processing of finished invasion runs.
//!
//! Replays the invasion backwards to find where the defending phase lost
//! its last path to an outlet. This is a separate pass over the immutable
//! invasion results: it never reopens invaded state, it only annotates.

use pn_core::PoreId;
use pn_net::Network;
use tracing::debug;

use crate::UNINVADED;
use crate::clusters::DisjointSets;
use crate::error::{PercResult, PercolationError};
use crate::invasion::InvasionPercolation;

/// Per-element trapping annotations for a finished invasion run.
///
/// `*_trap_sequence` holds the lowest sequence number of the forward step
/// that cut the element's defending region off from every outlet (-1 = not
/// trapped; 0 = sealed by the initial inlet state, or in a component that
/// never had an outlet at all).
#[derive(Debug, Clone, PartialEq)]
pub struct TrappingOutcome {
    pub pore_trapped: Vec<bool>,
    pub throat_trapped: Vec<bool>,
    pub pore_trap_sequence: Vec<i64>,
    pub throat_trap_sequence: Vec<i64>,
}

impl TrappingOutcome {
    fn untrapped(np: usize, nt: usize) -> Self {
        Self {
            pore_trapped: vec![false; np],
            throat_trapped: vec![false; nt],
            pore_trap_sequence: vec![UNINVADED; np],
            throat_trap_sequence: vec![UNINVADED; nt],
        }
    }

    pub fn trapped_pore_count(&self) -> usize {
        self.pore_trapped.iter().filter(|&&b| b).count()
    }

    pub fn trapped_throat_count(&self) -> usize {
        self.throat_trapped.iter().filter(|&&b| b).count()
    }
}

/// Defending-phase regions over pores and throats jointly.
///
/// Elements are indexed pores-first: pore p is `p`, throat t is `np + t`.
/// `escape` and `pending` are meaningful at set roots only; a flagged root
/// always has an empty pending list.
struct RegionTracker {
    ds: DisjointSets,
    escape: Vec<bool>,
    pending: Vec<Vec<u32>>,
}

impl RegionTracker {
    fn new(n: usize) -> Self {
        Self {
            ds: DisjointSets::new(n),
            escape: vec![false; n],
            pending: vec![Vec::new(); n],
        }
    }

    /// Union two defending elements during the replay of forward event
    /// `seq`. If the merge connects a sealed region to an escape-flagged
    /// one, that region's members were cut off by exactly this event:
    /// mark them all and retire them from further evaluation.
    fn merge(&mut self, a: usize, b: usize, seq: i64, np: usize, out: &mut TrappingOutcome) {
        let ra = self.ds.find(a);
        let rb = self.ds.find(b);
        if ra == rb {
            return;
        }
        let flagged = self.escape[ra] || self.escape[rb];
        let keep = self.ds.union(ra, rb);
        self.escape[keep] = flagged;
        if flagged {
            for side in [ra, rb] {
                for idx in std::mem::take(&mut self.pending[side]) {
                    mark(out, np, idx, seq);
                }
            }
        } else {
            let absorbed = if keep == ra { rb } else { ra };
            let mut moved = std::mem::take(&mut self.pending[absorbed]);
            self.pending[keep].append(&mut moved);
        }
    }
}

fn mark(out: &mut TrappingOutcome, np: usize, idx: u32, seq: i64) {
    let i = idx as usize;
    if i < np {
        out.pore_trapped[i] = true;
        out.pore_trap_sequence[i] = seq;
    } else {
        out.throat_trapped[i - np] = true;
        out.throat_trap_sequence[i - np] = seq;
    }
}

/// Determine which pores/throats had their defending phase permanently
/// isolated from all outlets, processing events in reverse invasion order.
///
/// Errors if the run is not finished or an outlet index is out of range.
/// An empty outlet set is degenerate: nothing can be trapped.
pub fn apply_trapping(
    ip: &InvasionPercolation<'_>,
    outlets: &[PoreId],
) -> PercResult<TrappingOutcome> {
    ip.require_finished("trapping analysis requires a finished invasion run")?;
    let net: &Network = ip.network();
    for &pore in outlets {
        if !net.contains_pore(pore) {
            return Err(PercolationError::Config {
                what: format!("outlet pore {} out of range", pore),
            });
        }
    }

    let np = net.pore_count();
    let nt = net.throat_count();
    let mut out = TrappingOutcome::untrapped(np, nt);
    if outlets.is_empty() {
        return Ok(out);
    }

    let pore_seq = &ip.pore_seq;
    let throat_seq = &ip.throat_seq;
    let mut is_outlet = vec![false; np];
    for &pore in outlets {
        is_outlet[pore.uindex()] = true;
    }

    let n = np + nt;
    let mut regions = RegionTracker::new(n);
    let mut defending = vec![false; n];

    // The never-invaded elements are defending from the start; a
    // never-invaded outlet pore is a standing escape hatch.
    for p in 0..np {
        if pore_seq[p] < 0 {
            defending[p] = true;
            if is_outlet[p] {
                regions.escape[p] = true;
            }
        }
    }
    for t in 0..nt {
        if throat_seq[t] < 0 {
            defending[np + t] = true;
        }
    }
    for (t, &[a, b]) in net.conns().iter().enumerate() {
        if defending[np + t] {
            for pore in [a, b] {
                if defending[pore.uindex()] {
                    // pending lists are still empty, so no marking can fire
                    regions.merge(np + t, pore.uindex(), 0, np, &mut out);
                }
            }
        }
    }
    for i in 0..n {
        if defending[i] {
            let root = regions.ds.find(i);
            if !regions.escape[root] {
                regions.pending[root].push(i as u32);
            }
        }
    }

    // Un-invade in strict reverse sequence order. A growth step is one
    // throat plus the pore it reached (the pore holds the throat's number
    // minus one); redundant fills and the shared inlet step stand alone.
    // Each step is undone atomically: its elements rejoin the defending
    // phase and reconnect before any is evaluated, since at the forward
    // instant just before the step they were all still defender-filled.
    let mut events: Vec<(i64, u32)> = Vec::new();
    for (p, &s) in pore_seq.iter().enumerate() {
        if s >= 0 {
            events.push((s, p as u32));
        }
    }
    for (t, &s) in throat_seq.iter().enumerate() {
        if s >= 0 {
            events.push((s, (np + t) as u32));
        }
    }
    events.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    debug!(events = events.len(), outlets = outlets.len(), "trapping replay");

    let mut i = 0;
    while i < events.len() {
        let start = i;
        let (seq, idx) = events[i];
        i += 1;
        if idx as usize >= np && seq > 1 && i < events.len() {
            // Companion pore of a growth throat sits right behind it
            let (next_seq, next_idx) = events[i];
            if next_seq == seq - 1 && (next_idx as usize) < np {
                i += 1;
            }
        } else if seq == 0 {
            // All inlets share step 0
            while i < events.len() && events[i].0 == 0 {
                i += 1;
            }
        }
        let group = &events[start..i];
        // Marked regions record the step's lowest sequence number.
        let mark_seq = group.last().map(|&(s, _)| s).unwrap_or(0);

        for &(_, idx) in group {
            defending[idx as usize] = true;
        }
        for &(_, idx) in group {
            let e = idx as usize;
            if e < np && is_outlet[e] {
                let root = regions.ds.find(e);
                regions.escape[root] = true;
            }
        }
        for &(_, idx) in group {
            let e = idx as usize;
            if e < np {
                for &t in net.pore_throats(PoreId::from_index(e as u32)) {
                    let ti = np + t.uindex();
                    if defending[ti] {
                        regions.merge(e, ti, mark_seq, np, &mut out);
                    }
                }
            } else {
                let [a, b] = net.conns()[e - np];
                for pore in [a, b] {
                    if defending[pore.uindex()] {
                        regions.merge(e, pore.uindex(), mark_seq, np, &mut out);
                    }
                }
            }
        }
        for &(_, idx) in group {
            let root = regions.ds.find(idx as usize);
            if !regions.escape[root] {
                regions.pending[root].push(idx);
            }
        }
    }

    // Regions that never reconnected belong to components with no outlet:
    // sealed before any invasion step.
    for root in 0..n {
        for idx in std::mem::take(&mut regions.pending[root]) {
            mark(&mut out, np, idx, 0);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invasion::{InvasionPercolation, StopCondition};
    use pn_net::NetworkBuilder;

    #[test]
    fn trapping_requires_finished_run() {
        let mut builder = NetworkBuilder::new();
        let p0 = builder.add_pore();
        let p1 = builder.add_pore();
        builder.add_throat(p0, p1);
        let net = builder.build().unwrap();
        let entry = [1.0];
        let alg = InvasionPercolation::new(&net, &entry).unwrap();
        assert!(matches!(
            apply_trapping(&alg, &[p1]),
            Err(PercolationError::InvalidState { .. })
        ));
    }

    #[test]
    fn trapping_rejects_bad_outlets() {
        let mut builder = NetworkBuilder::new();
        let p0 = builder.add_pore();
        let p1 = builder.add_pore();
        builder.add_throat(p0, p1);
        let net = builder.build().unwrap();
        let entry = [1.0];
        let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
        alg.set_inlets(&[p0]).unwrap();
        alg.run(StopCondition::Complete).unwrap();
        assert!(apply_trapping(&alg, &[PoreId::from_index(9)]).is_err());
    }

    #[test]
    fn no_outlets_traps_nothing() {
        let mut builder = NetworkBuilder::new();
        let p0 = builder.add_pore();
        let p1 = builder.add_pore();
        builder.add_throat(p0, p1);
        let net = builder.build().unwrap();
        let entry = [1.0];
        let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
        alg.set_inlets(&[p0]).unwrap();
        alg.run(StopCondition::Complete).unwrap();

        let outcome = apply_trapping(&alg, &[]).unwrap();
        assert_eq!(outcome.trapped_pore_count(), 0);
        assert_eq!(outcome.trapped_throat_count(), 0);
    }

    #[test]
    fn open_chain_traps_nothing() {
        // Invasion sweeps 0 -> 3; the defender always escapes ahead of the
        // front through the outlet at pore 3.
        let mut builder = NetworkBuilder::new();
        builder.add_pores(4);
        for i in 0..3 {
            builder.add_throat(PoreId::from_index(i), PoreId::from_index(i + 1));
        }
        let net = builder.build().unwrap();
        let entry = [1.0, 2.0, 3.0];
        let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
        alg.set_inlets(&[PoreId::from_index(0)]).unwrap();
        alg.run(StopCondition::Complete).unwrap();

        let outcome = apply_trapping(&alg, &[PoreId::from_index(3)]).unwrap();
        assert_eq!(outcome.trapped_pore_count(), 0);
        assert_eq!(outcome.trapped_throat_count(), 0);
    }

    #[test]
    fn dead_end_pocket_is_trapped() {
        // 0 -t0- 1 -t1- 2 (outlet), with a dead-end pore 3 hanging off
        // pore 1 behind an expensive throat t2. The front passes pore 1
        // before t2 is ever affordable, so the defender in pore 3 and t2
        // is sealed the moment pore 1 is invaded (forward step 1).
        let mut builder = NetworkBuilder::new();
        let p0 = builder.add_pore();
        let p1 = builder.add_pore();
        let p2 = builder.add_pore();
        let p3 = builder.add_pore();
        builder.add_throat(p0, p1); // t0
        builder.add_throat(p1, p2); // t1
        builder.add_throat(p1, p3); // t2
        let net = builder.build().unwrap();
        let entry = [1.0, 2.0, 9.0];
        let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
        alg.set_inlets(&[p0]).unwrap();
        alg.run(StopCondition::Complete).unwrap();

        // t2 eventually invades pore 3 in the forward pass (the frontier
        // never gives up), but the trapping pass voids the escape.
        assert!(alg.pore_sequence().unwrap()[3] > 0);

        let outcome = apply_trapping(&alg, &[p2]).unwrap();
        assert!(outcome.pore_trapped[3]);
        assert!(outcome.throat_trapped[2]);
        assert!(!outcome.pore_trapped[0]);
        assert!(!outcome.pore_trapped[1]);
        assert!(!outcome.pore_trapped[2]);
        assert!(!outcome.throat_trapped[0]);
        assert!(!outcome.throat_trapped[1]);
        // Sealed when pore 1 was invaded
        assert_eq!(outcome.pore_trap_sequence[3], alg.pore_sequence().unwrap()[1]);
        assert_eq!(outcome.throat_trap_sequence[2], alg.pore_sequence().unwrap()[1]);
    }

    #[test]
    fn component_without_outlet_is_sealed_from_the_start() {
        // Two disjoint pairs; inlet and outlet both in the first.
        let mut builder = NetworkBuilder::new();
        let p0 = builder.add_pore();
        let p1 = builder.add_pore();
        let p2 = builder.add_pore();
        let p3 = builder.add_pore();
        builder.add_throat(p0, p1);
        builder.add_throat(p2, p3);
        let net = builder.build().unwrap();
        let entry = [1.0, 1.0];
        let mut alg = InvasionPercolation::new(&net, &entry).unwrap();
        alg.set_inlets(&[p0]).unwrap();
        alg.run(StopCondition::Complete).unwrap();

        let outcome = apply_trapping(&alg, &[p1]).unwrap();
        assert!(outcome.pore_trapped[2] && outcome.pore_trapped[3]);
        assert!(outcome.throat_trapped[1]);
        assert_eq!(outcome.pore_trap_sequence[2], 0);
        // The invaded component reached the outlet; nothing trapped there.
        assert!(!outcome.pore_trapped[0] && !outcome.pore_trapped[1]);
        assert!(!outcome.throat_trapped[0]);
    }
}
