//! Invasion percolation: sequential frontier growth.
//!
//! Grows one or more clusters from the inlet pores by always advancing
//! along the globally lowest entry-pressure frontier throat, producing a
//! strict total order of invasion events over pores and throats. No
//! monotonic pressure assumption is made; the frontier may retreat to a
//! cheaper throat opened up by a later, more expensive step.

use pn_core::{PoreId, Real};
use pn_net::Network;
use tracing::debug;

use crate::clusters::DisjointSets;
use crate::error::{PercResult, PercolationError};
use crate::frontier::Frontier;
use crate::report::{CurvePoint, InvasionReport, PercolationCurve};
use crate::{UNINVADED, validate_entry_pressures, validate_volumes};

/// When a run stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopCondition {
    /// Run until the frontier is exhausted.
    Complete,
    /// Stop once this many pores (inlets included) are invaded.
    InvadedPores(usize),
    /// Stop once this fraction of all pores is invaded.
    InvadedFraction(Real),
}

impl StopCondition {
    fn validate(&self) -> PercResult<()> {
        if let StopCondition::InvadedFraction(f) = *self {
            if !f.is_finite() || !(0.0..=1.0).contains(&f) {
                return Err(PercolationError::Config {
                    what: format!("invaded fraction must be in [0, 1], got {f}"),
                });
            }
        }
        Ok(())
    }
}

/// Externally visible run states.
///
/// `run()` is synchronous, so there is no observable Running state:
/// callers see Ready before and Finished after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Ready,
    Finished,
}

/// Stepwise invasion simulator over a fixed network.
///
/// Lifecycle: `new` → `set_inlets` → `run` → result accessors; `reset`
/// re-arms a finished engine with the same inlets. Operations out of that
/// order fail with `InvalidState`. All mutable state is private to the run.
pub struct InvasionPercolation<'a> {
    net: &'a Network,
    entry_pressures: &'a [Real],
    phase: Phase,
    merge_inlets: bool,
    inlets: Option<Vec<PoreId>>,
    volumes: Option<(Vec<Real>, Vec<Real>)>,

    pub(crate) pore_seq: Vec<i64>,
    pub(crate) throat_seq: Vec<i64>,
    pore_cluster_labels: Vec<i64>,
    clusters: DisjointSets,
    frontier: Frontier,
    next_seq: i64,
    invaded_pores: usize,
}

impl<'a> InvasionPercolation<'a> {
    /// Validates the entry-pressure array once at ingestion (length,
    /// finiteness, non-negativity).
    pub fn new(net: &'a Network, entry_pressures: &'a [Real]) -> PercResult<Self> {
        validate_entry_pressures(net, entry_pressures)?;
        Ok(Self {
            net,
            entry_pressures,
            phase: Phase::Uninitialized,
            merge_inlets: false,
            inlets: None,
            volumes: None,
            pore_seq: vec![UNINVADED; net.pore_count()],
            throat_seq: vec![UNINVADED; net.throat_count()],
            pore_cluster_labels: vec![UNINVADED; net.pore_count()],
            clusters: DisjointSets::new(net.pore_count()),
            frontier: Frontier::new(),
            next_seq: 1,
            invaded_pores: 0,
        })
    }

    /// Treat the inlets as one hydraulically connected boundary: all inlet
    /// pores share a single cluster instead of seeding one each.
    pub fn merge_inlets(&mut self, merge: bool) -> PercResult<()> {
        if self.phase == Phase::Finished {
            return Err(PercolationError::InvalidState {
                what: "finished run must be reset before reconfiguring inlets",
            });
        }
        self.merge_inlets = merge;
        if self.phase == Phase::Ready {
            self.prime();
        }
        Ok(())
    }

    /// Declare the inlet pores, replacing any previous set.
    ///
    /// Every inlet is marked invaded with sequence 0 and its incident
    /// throats join the frontier. An empty set is legal: the run finishes
    /// immediately with nothing invaded.
    pub fn set_inlets(&mut self, inlets: &[PoreId]) -> PercResult<()> {
        if self.phase == Phase::Finished {
            return Err(PercolationError::InvalidState {
                what: "finished run must be reset before changing inlets",
            });
        }
        for &pore in inlets {
            if !self.net.contains_pore(pore) {
                return Err(PercolationError::Config {
                    what: format!("inlet pore {} out of range", pore),
                });
            }
        }
        let mut inlets = inlets.to_vec();
        inlets.sort_unstable();
        inlets.dedup();
        self.inlets = Some(inlets);
        self.prime();
        Ok(())
    }

    /// Supply pore/throat volumes; saturation in the intrusion curve and
    /// occupancy queries becomes volume-weighted.
    pub fn set_volumes(&mut self, pore: Vec<Real>, throat: Vec<Real>) -> PercResult<()> {
        validate_volumes(self.net, &pore, &throat)?;
        self.volumes = Some((pore, throat));
        Ok(())
    }

    /// Rebuild run state from the stored configuration.
    fn prime(&mut self) {
        self.pore_seq.fill(UNINVADED);
        self.throat_seq.fill(UNINVADED);
        self.pore_cluster_labels.fill(UNINVADED);
        self.clusters = DisjointSets::new(self.net.pore_count());
        self.frontier.clear();
        self.next_seq = 1;
        self.invaded_pores = 0;

        let inlets = self.inlets.as_deref().unwrap_or(&[]);
        for &inlet in inlets {
            self.pore_seq[inlet.uindex()] = 0;
            for &t in self.net.pore_throats(inlet) {
                self.frontier.push(self.entry_pressures[t.uindex()], t);
            }
        }
        self.invaded_pores = inlets.len();
        if self.merge_inlets {
            for pair in inlets.windows(2) {
                self.clusters.union(pair[0].uindex(), pair[1].uindex());
            }
        }
        self.phase = Phase::Ready;
    }

    /// Advance the invasion until the frontier empties or `stop` is met.
    ///
    /// Each step pops the cheapest frontier throat. A throat whose
    /// endpoints are both already invaded reaches no new pore: it fills
    /// with its own sequence number and merges its endpoints' clusters
    /// (this is how fronts from separate inlets join). Otherwise the newly
    /// reached pore takes the next sequence number and the throat the one
    /// after, so a throat's number bounds both of its endpoints' numbers
    /// from above.
    pub fn run(&mut self, stop: StopCondition) -> PercResult<()> {
        match self.phase {
            Phase::Uninitialized => {
                return Err(PercolationError::InvalidState {
                    what: "set_inlets must be called before run",
                });
            }
            Phase::Finished => {
                return Err(PercolationError::InvalidState {
                    what: "finished run must be reset before running again",
                });
            }
            Phase::Ready => {}
        }
        stop.validate()?;
        let net = self.net;
        debug!(
            inlets = self.invaded_pores,
            frontier = self.frontier.len(),
            "invasion percolation run"
        );

        while !self.stop_reached(stop) {
            let Some((_, throat)) = self.frontier.pop() else {
                break;
            };
            let ti = throat.uindex();
            if self.throat_seq[ti] >= 0 {
                continue; // stale duplicate
            }
            let [a, b] = net.conns()[ti];
            let a_invaded = self.pore_seq[a.uindex()] >= 0;
            let b_invaded = self.pore_seq[b.uindex()] >= 0;
            if a_invaded && b_invaded {
                // Redundant edge: fills without reaching a pore
                self.throat_seq[ti] = self.next_seq;
                self.next_seq += 1;
                self.clusters.union(a.uindex(), b.uindex());
                continue;
            }
            let newly = if a_invaded { b } else { a };

            self.pore_seq[newly.uindex()] = self.next_seq;
            self.throat_seq[ti] = self.next_seq + 1;
            self.next_seq += 2;
            self.invaded_pores += 1;
            self.clusters.union(a.uindex(), b.uindex());

            for &t in net.pore_throats(newly) {
                if self.throat_seq[t.uindex()] < 0 {
                    self.frontier.push(self.entry_pressures[t.uindex()], t);
                }
            }
        }

        for (i, label) in self.pore_cluster_labels.iter_mut().enumerate() {
            *label = if self.pore_seq[i] >= 0 {
                self.clusters.label(i) as i64
            } else {
                UNINVADED
            };
        }
        self.phase = Phase::Finished;
        debug!(
            invaded_pores = self.invaded_pores,
            last_seq = self.next_seq - 1,
            "invasion percolation finished"
        );
        Ok(())
    }

    fn stop_reached(&self, stop: StopCondition) -> bool {
        match stop {
            StopCondition::Complete => false,
            StopCondition::InvadedPores(n) => self.invaded_pores >= n,
            StopCondition::InvadedFraction(f) => {
                self.invaded_pores as Real >= f * self.net.pore_count() as Real
            }
        }
    }

    /// Return a finished engine to Ready with the same configuration.
    pub fn reset(&mut self) {
        if self.inlets.is_some() {
            self.prime();
        } else {
            self.phase = Phase::Uninitialized;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub(crate) fn require_finished(&self, what: &'static str) -> PercResult<()> {
        if self.phase != Phase::Finished {
            return Err(PercolationError::InvalidState { what });
        }
        Ok(())
    }

    /// Network this run operates on.
    pub fn network(&self) -> &'a Network {
        self.net
    }

    /// Per-pore invasion sequence numbers; -1 = never invaded.
    pub fn pore_sequence(&self) -> PercResult<&[i64]> {
        self.require_finished("pore sequence requires a finished run")?;
        Ok(&self.pore_seq)
    }

    /// Per-throat invasion sequence numbers; -1 = never invaded.
    pub fn throat_sequence(&self) -> PercResult<&[i64]> {
        self.require_finished("throat sequence requires a finished run")?;
        Ok(&self.throat_seq)
    }

    /// Cluster label per pore (lowest member pore index); -1 = uninvaded.
    pub fn pore_clusters(&self) -> PercResult<&[i64]> {
        self.require_finished("cluster labels require a finished run")?;
        Ok(&self.pore_cluster_labels)
    }

    /// Number of invaded pores, inlets included.
    pub fn invaded_pore_count(&self) -> usize {
        self.invaded_pores
    }

    /// Capillary-pressure curve of the completed run: running maximum of
    /// invaded entry pressures against cumulative saturation, one point per
    /// invaded throat.
    pub fn intrusion_curve(&self) -> PercResult<PercolationCurve> {
        self.require_finished("intrusion curve requires a finished run")?;
        let events = self.events_in_order();
        let total = self.total_volume();
        let mut cum = self.inlet_weight(total);
        let mut pressure: Real = 0.0;
        let mut points = Vec::new();
        for &(_, elem) in &events {
            match elem {
                Element::Pore(p) => cum += self.pore_weight(p, total),
                Element::Throat(t) => {
                    cum += self.throat_weight(t, total);
                    pressure = pressure.max(self.entry_pressures[t]);
                    points.push(CurvePoint {
                        pressure,
                        saturation: cum,
                    });
                }
            }
        }
        Ok(PercolationCurve::new(points))
    }

    /// Boolean occupancy arrays for the earliest invasion prefix reaching
    /// the target invading-phase saturation.
    pub fn occupancy_at(&self, saturation: Real) -> PercResult<(Vec<bool>, Vec<bool>)> {
        self.require_finished("occupancy requires a finished run")?;
        if !saturation.is_finite() || !(0.0..=1.0).contains(&saturation) {
            return Err(PercolationError::Config {
                what: format!("target saturation must be in [0, 1], got {saturation}"),
            });
        }

        let total = self.total_volume();
        let mut cutoff = 0i64; // inlets only
        let mut cum = self.inlet_weight(total);
        if cum < saturation {
            for &(seq, elem) in &self.events_in_order() {
                match elem {
                    Element::Pore(p) => cum += self.pore_weight(p, total),
                    Element::Throat(t) => cum += self.throat_weight(t, total),
                }
                cutoff = seq;
                if cum >= saturation {
                    break;
                }
            }
        }

        let pore_occ = self
            .pore_seq
            .iter()
            .map(|&s| s >= 0 && s <= cutoff)
            .collect();
        let throat_occ = self
            .throat_seq
            .iter()
            .map(|&s| s >= 0 && s <= cutoff)
            .collect();
        Ok((pore_occ, throat_occ))
    }

    /// Snapshot for export.
    pub fn report(&self) -> PercResult<InvasionReport> {
        self.require_finished("report requires a finished run")?;
        Ok(InvasionReport {
            pore_sequence: self.pore_seq.clone(),
            throat_sequence: self.throat_seq.clone(),
            pore_clusters: self.pore_cluster_labels.clone(),
            pore_trapped: vec![],
            throat_trapped: vec![],
        })
    }

    /// All invasion events after the inlets, ordered by sequence number.
    fn events_in_order(&self) -> Vec<(i64, Element)> {
        let mut events: Vec<(i64, Element)> = Vec::with_capacity(
            self.invaded_pores + self.throat_seq.iter().filter(|&&s| s >= 0).count(),
        );
        for (i, &s) in self.pore_seq.iter().enumerate() {
            if s > 0 {
                events.push((s, Element::Pore(i)));
            }
        }
        for (i, &s) in self.throat_seq.iter().enumerate() {
            if s > 0 {
                events.push((s, Element::Throat(i)));
            }
        }
        events.sort_unstable_by_key(|&(s, _)| s);
        events
    }

    fn total_volume(&self) -> Real {
        match &self.volumes {
            Some((pore, throat)) => pore.iter().sum::<Real>() + throat.iter().sum::<Real>(),
            None => (self.net.pore_count() + self.net.throat_count()) as Real,
        }
    }

    fn inlet_weight(&self, total: Real) -> Real {
        self.pore_seq
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == 0)
            .map(|(i, _)| self.pore_weight(i, total))
            .sum()
    }

    fn pore_weight(&self, i: usize, total: Real) -> Real {
        match &self.volumes {
            Some((pore, _)) => pore[i] / total,
            None => 1.0 / total,
        }
    }

    fn throat_weight(&self, i: usize, total: Real) -> Real {
        match &self.volumes {
            Some((_, throat)) => throat[i] / total,
            None => 1.0 / total,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Element {
    Pore(usize),
    Throat(usize),
}
