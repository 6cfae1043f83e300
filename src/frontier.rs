//! Propagation along the infectious frontier.
//!
//! Each day every vertex in the queue, in queue order, draws how many of its neighbors it
//! contacts, picks that many distinct neighbors, and infects (or kills) the ones that are still
//! susceptible. This is a breadth-first traversal with a random, degree-bounded fan-out per
//! level. Vertices infected today are appended to the queue but only spread from tomorrow on.
use log::trace;

use crate::error::ContagionError;
use crate::graph::{Graph, Vertex};
use crate::parameters::ParameterSet;
use crate::random::{sample_multiple_from_known_length, RandomSource};
use crate::state::SimulationState;
use crate::status::{resolve_exposure, Day, VertexStatus};

/// A susceptible vertex reached by an infectious one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Exposure {
    pub source: Vertex,
    pub target: Vertex,
    pub outcome: VertexStatus,
}

/// Everything propagation did on one day.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Propagation {
    pub exposures: Vec<Exposure>,
    /// Contacts that landed on a vertex that was not susceptible.
    pub blocked_contacts: usize,
}

impl Propagation {
    #[must_use]
    pub fn new_cases(&self) -> usize {
        self.exposures
            .iter()
            .filter(|exposure| exposure.outcome.is_infectious())
            .count()
    }

    #[must_use]
    pub fn new_deaths(&self) -> usize {
        self.exposures
            .iter()
            .filter(|exposure| exposure.outcome.is_dead())
            .count()
    }
}

/// Draws how many neighbors a vertex contacts today: `round(uniform(r0 - r0_delta, r0 +
/// r0_delta))`, clamped to `[0, degree]`. Always consumes one draw, even when the range is a
/// single point.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn contact_count<R: RandomSource + ?Sized>(
    rng: &mut R,
    parameters: &ParameterSet,
    degree: usize,
) -> usize {
    let (low, high) = parameters.contact_range();
    let drawn = rng.uniform_range(low, high).round();
    if drawn <= 0.0 {
        return 0;
    }
    // Saturating float-to-int cast.
    (drawn as usize).min(degree)
}

/// Runs one day of propagation from the current frontier of `state`, recording every outcome
/// in `state`. Returns what happened.
///
/// # Errors
///
/// Returns `ContagionError::NotFound` if a frontier vertex or one of its neighbors is not known
/// to `graph` or to `state`, which means the two were not built together. `state` may be
/// partially updated in that case; callers work on a copy.
pub fn propagate<R: RandomSource + ?Sized>(
    graph: &Graph,
    state: &mut SimulationState,
    day: Day,
    parameters: &ParameterSet,
    rng: &mut R,
) -> Result<Propagation, ContagionError> {
    let mut propagation = Propagation::default();

    for source in state.frontier_snapshot() {
        let neighbors = graph.neighbors(&source)?;
        let k = contact_count(rng, parameters, neighbors.len());
        let contacts = sample_multiple_from_known_length(rng, neighbors.iter(), k);
        trace!("day {day}: {source} contacts {k} of {} neighbors", neighbors.len());

        for target in contacts {
            if !state.status(target)?.is_susceptible() {
                propagation.blocked_contacts += 1;
                continue;
            }
            let outcome = resolve_exposure(rng, day, parameters);
            trace!("day {day}: {source} exposed {target}: {outcome}");
            state.infect(target, outcome)?;
            propagation.exposures.push(Exposure {
                source: source.clone(),
                target: target.clone(),
                outcome,
            });
        }
    }

    Ok(propagation)
}
