//! The state of a run on a given day.
//!
//! The per-vertex status map is the single source of truth. The infectious queue, the set of
//! active cases and the infection, quarantine and immunity ledgers are all views derived from
//! it; the only thing stored next to the map is the order of the queue, which the status map
//! cannot express. Aggregate counts are updated in the same call that changes a status, so the
//! two can never disagree.
use std::collections::VecDeque;
use std::ops::Index;

use log::trace;
use serde::Serialize;

use crate::error::ContagionError;
use crate::graph::{Graph, Vertex};
use crate::hashing::IndexMap;
use crate::parameters::ParameterSet;
use crate::status::{Day, InfectionRecord, StatusKind, Transition, VertexStatus};

/// Number of vertices in each status, plus the running total of infections.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub quarantined: usize,
    pub immune: usize,
    pub dead: usize,
    /// Every infection since day 0, the seed included. Deaths are not infections.
    pub cumulative_cases: usize,
}

impl StatusCounts {
    fn slot(&mut self, kind: StatusKind) -> &mut usize {
        match kind {
            StatusKind::Susceptible => &mut self.susceptible,
            StatusKind::Infected => &mut self.infected,
            StatusKind::Quarantined => &mut self.quarantined,
            StatusKind::Immune => &mut self.immune,
            StatusKind::Dead => &mut self.dead,
        }
    }

    /// Infected plus quarantined: the vertices currently part of the outbreak.
    #[must_use]
    pub fn active_cases(&self) -> usize {
        self.infected + self.quarantined
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.quarantined + self.immune + self.dead
    }
}

impl Index<StatusKind> for StatusCounts {
    type Output = usize;

    fn index(&self, kind: StatusKind) -> &usize {
        match kind {
            StatusKind::Susceptible => &self.susceptible,
            StatusKind::Infected => &self.infected,
            StatusKind::Quarantined => &self.quarantined,
            StatusKind::Immune => &self.immune,
            StatusKind::Dead => &self.dead,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationState {
    day: Day,
    statuses: IndexMap<Vertex, VertexStatus>,
    /// Infectious vertices in processing order. Holds exactly the vertices whose status is
    /// `Infected` once a step completes.
    to_infect: VecDeque<Vertex>,
    counts: StatusCounts,
}

impl SimulationState {
    /// Creates day 0 of a run over `graph`: `seed` is infected and is the whole frontier,
    /// every other vertex is susceptible.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::NotFound` if `seed` is not part of `graph`.
    pub fn new(graph: &Graph, seed: &str) -> Result<Self, ContagionError> {
        if !graph.contains(seed) {
            return Err(ContagionError::not_found(seed));
        }

        let statuses: IndexMap<Vertex, VertexStatus> = graph
            .vertices()
            .map(|vertex| (vertex.clone(), VertexStatus::Susceptible))
            .collect();
        let mut state = SimulationState {
            day: 0,
            counts: StatusCounts {
                susceptible: statuses.len(),
                ..StatusCounts::default()
            },
            statuses,
            to_infect: VecDeque::new(),
        };
        state.infect(seed, VertexStatus::Infected { since: 0 })?;
        Ok(state)
    }

    #[must_use]
    pub fn day(&self) -> Day {
        self.day
    }

    /// Returns the status of `vertex`.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::NotFound` if `vertex` was not in the graph the run was
    /// created from.
    pub fn status(&self, vertex: &str) -> Result<VertexStatus, ContagionError> {
        self.statuses
            .get(vertex)
            .copied()
            .ok_or_else(|| ContagionError::not_found(vertex))
    }

    /// Every vertex with its status, in graph order.
    pub fn statuses(&self) -> impl Iterator<Item = (&Vertex, VertexStatus)> + '_ {
        self.statuses.iter().map(|(vertex, status)| (vertex, *status))
    }

    /// Vertices with the given kind of status, in graph order.
    pub fn vertices_with(&self, kind: StatusKind) -> impl Iterator<Item = &Vertex> + '_ {
        self.statuses
            .iter()
            .filter(move |(_, status)| status.kind() == kind)
            .map(|(vertex, _)| vertex)
    }

    /// The infectious frontier in the order it will be processed next step.
    pub fn to_infect(&self) -> impl ExactSizeIterator<Item = &Vertex> + '_ {
        self.to_infect.iter()
    }

    /// Vertices counted as part of the outbreak: infected or quarantined.
    pub fn infected(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.statuses
            .iter()
            .filter(|(_, status)| status.is_active_case())
            .map(|(vertex, _)| vertex)
    }

    /// Day of infection for every active case, and the dead.
    pub fn infection_ledger(&self) -> impl Iterator<Item = (&Vertex, InfectionRecord)> + '_ {
        self.statuses.iter().filter_map(|(vertex, status)| {
            if status.is_dead() {
                return Some((vertex, InfectionRecord::Dead));
            }
            status
                .infection_day()
                .map(|day| (vertex, InfectionRecord::InfectedOn(day)))
        })
    }

    /// The day each quarantined vertex's clock is anchored to (its infection day).
    pub fn quarantine_ledger(&self) -> impl Iterator<Item = (&Vertex, Day)> + '_ {
        self.statuses
            .iter()
            .filter_map(|(vertex, status)| match status {
                VertexStatus::Quarantined { infected_on } => Some((vertex, *infected_on)),
                _ => None,
            })
    }

    /// The day each immune vertex became immune.
    pub fn immunity_ledger(&self) -> impl Iterator<Item = (&Vertex, Day)> + '_ {
        self.statuses
            .iter()
            .filter_map(|(vertex, status)| match status {
                VertexStatus::Immune { since } => Some((vertex, *since)),
                _ => None,
            })
    }

    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        self.counts
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.statuses.len()
    }

    /// True once nothing is infected or quarantined: with no source of infection left, no
    /// further step can produce a case.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.counts.active_cases() == 0
    }

    pub(crate) fn advance_day(&mut self) -> Day {
        self.day += 1;
        self.day
    }

    /// Snapshot of the frontier for the step about to run.
    pub(crate) fn frontier_snapshot(&self) -> Vec<Vertex> {
        self.to_infect.iter().cloned().collect()
    }

    /// Gives a susceptible `vertex` the outcome of an exposure. Newly infected vertices join
    /// the back of the queue; the dead never do.
    pub(crate) fn infect(
        &mut self,
        vertex: &str,
        outcome: VertexStatus,
    ) -> Result<(), ContagionError> {
        let previous = self.set_status(vertex, outcome)?;
        debug_assert!(previous.is_susceptible(), "{vertex} was {previous:?}");
        if outcome.is_infectious() {
            self.counts.cumulative_cases += 1;
            self.to_infect.push_back(vertex.to_string());
        }
        Ok(())
    }

    /// Applies every lifecycle move due on `day`. The moves are selected from the statuses as
    /// they stand, then applied, so nothing selected this pass is evaluated twice. Returns the
    /// applied moves in graph order.
    pub(crate) fn apply_lifecycle(
        &mut self,
        day: Day,
        parameters: &ParameterSet,
    ) -> Result<Vec<(Vertex, Transition)>, ContagionError> {
        let due: Vec<(Vertex, Transition)> = self
            .statuses
            .iter()
            .filter_map(|(vertex, status)| {
                status
                    .due_transition(day, parameters)
                    .map(|transition| (vertex.clone(), transition))
            })
            .collect();

        for (vertex, transition) in &due {
            let current = self.status(vertex)?;
            let next = current.after(*transition, day);
            trace!("day {day}: {vertex} {current} -> {next}");
            self.set_status(vertex, next)?;
        }

        // Quarantined, immune and susceptible vertices leave the queue.
        let statuses = &self.statuses;
        self.to_infect
            .retain(|vertex| statuses.get(vertex).is_some_and(VertexStatus::is_infectious));

        Ok(due)
    }

    fn set_status(
        &mut self,
        vertex: &str,
        status: VertexStatus,
    ) -> Result<VertexStatus, ContagionError> {
        let slot = self
            .statuses
            .get_mut(vertex)
            .ok_or_else(|| ContagionError::not_found(vertex))?;
        let previous = std::mem::replace(slot, status);
        debug_assert!(!previous.is_dead() || status.is_dead(), "{vertex} was dead");
        *self.counts.slot(previous.kind()) -= 1;
        *self.counts.slot(status.kind()) += 1;
        Ok(previous)
    }
}
