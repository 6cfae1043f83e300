//! Advancing a run by one day.
//!
//! [`step`] is a pure function: it reads the graph, the prior state and a parameter snapshot,
//! and returns the next state together with the day's [`StepReport`]. The prior state is never
//! touched, so a step that fails part way leaves nothing half applied.
//!
//! [`Simulation`] owns a graph, the current state and an optional bounded history, and is what
//! drivers (the automatic runner, the console) step forward and rewind.
use std::collections::VecDeque;

use log::{debug, info};

use crate::error::ContagionError;
use crate::frontier::propagate;
use crate::graph::Graph;
use crate::parameters::ParameterSet;
use crate::random::RandomSource;
use crate::report::StepReport;
use crate::state::SimulationState;

/// Computes the day after `state`.
///
/// Within the day, propagation runs first: every vertex of the frontier contacts its
/// neighbors and the reached susceptible vertices are infected or killed. Lifecycle moves are
/// applied afterwards, against the statuses as they stand once propagation is done.
///
/// # Errors
///
/// Returns `ContagionError::InvalidParameter` if `parameters` fail validation and
/// `ContagionError::NotFound` if `state` refers to vertices `graph` does not have. `state` is
/// unchanged in both cases.
pub fn step<R: RandomSource + ?Sized>(
    graph: &Graph,
    state: &SimulationState,
    parameters: &ParameterSet,
    rng: &mut R,
) -> Result<(SimulationState, StepReport), ContagionError> {
    parameters.validate()?;

    let mut next = state.clone();
    let day = next.advance_day();
    let propagation = propagate(graph, &mut next, day, parameters, rng)?;
    let moves = next.apply_lifecycle(day, parameters)?;

    let report = StepReport::from_state(&next, propagation.new_cases(), propagation.new_deaths());
    debug!(
        "day {day}: {} new cases, {} new deaths, {} blocked contacts, {} lifecycle moves, {} active",
        report.new_cases,
        report.new_deaths,
        propagation.blocked_contacts,
        moves.len(),
        report.total_cases
    );
    Ok((next, report))
}

/// A run over one graph, with the current day and, when asked for, the days before it.
///
/// No prior days are kept unless [`Simulation::with_history`] enables it, so a long automatic
/// run holds one state at a time.
#[derive(Clone, Debug)]
pub struct Simulation {
    graph: Graph,
    state: SimulationState,
    report: StepReport,
    history: VecDeque<(SimulationState, StepReport)>,
    history_limit: Option<usize>,
}

impl Simulation {
    /// Starts a run on day 0 with `seed` infected.
    ///
    /// # Errors
    ///
    /// Returns `ContagionError::NotFound` if `seed` is not a vertex of `graph`.
    pub fn new(graph: Graph, seed: &str) -> Result<Self, ContagionError> {
        let state = SimulationState::new(&graph, seed)?;
        info!(
            "starting run over {} vertices and {} edges, seed {seed}",
            graph.vertex_count(),
            graph.edge_count()
        );
        let report = StepReport::from_state(&state, 1, 0);
        Ok(Simulation {
            graph,
            state,
            report,
            history: VecDeque::new(),
            history_limit: Some(0),
        })
    }

    /// Keeps up to `limit` prior days for [`Simulation::rewind`], or every day with `None`.
    /// The oldest days are dropped first.
    #[must_use]
    pub fn with_history(mut self, limit: Option<usize>) -> Self {
        self.history_limit = limit;
        self.trim_history();
        self
    }

    fn trim_history(&mut self) {
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Runs one step and makes its result the current day.
    ///
    /// # Errors
    ///
    /// Propagates the error of [`step`]; the current day is kept as it was.
    pub fn step<R: RandomSource + ?Sized>(
        &mut self,
        parameters: &ParameterSet,
        rng: &mut R,
    ) -> Result<StepReport, ContagionError> {
        let (next, report) = step(&self.graph, &self.state, parameters, rng)?;
        let previous = std::mem::replace(&mut self.state, next);
        let previous_report = std::mem::replace(&mut self.report, report);
        if self.history_limit != Some(0) {
            self.history.push_back((previous, previous_report));
            self.trim_history();
        }
        Ok(report)
    }

    /// Goes back to the previous day. Returns `false` when no earlier day is kept.
    ///
    /// Random draws are not rewound: stepping again from the restored day continues the
    /// random sequence.
    pub fn rewind(&mut self) -> bool {
        match self.history.pop_back() {
            Some((previous, report)) => {
                debug!("rewinding from day {} to day {}", self.state.day(), previous.day());
                self.state = previous;
                self.report = report;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// The kept states of the days before the current one, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &SimulationState> + '_ {
        self.history.iter().map(|(state, _)| state)
    }

    #[must_use]
    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    /// The report for the current day, as it was produced by the step into it. Day 0 reports
    /// the seed as its only new case.
    #[must_use]
    pub fn current_report(&self) -> StepReport {
        self.report
    }
}
