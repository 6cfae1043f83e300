//! Per-vertex epidemiological status and the rules for moving between statuses.
//!
//! ```text
//!                 death roll succeeds
//!   Susceptible ----------------------------------------------> Dead
//!        |  ^
//!        |  | immunity expires
//!        |  +-------------------------------- Immune <---------------+
//!        |  death roll fails                    ^                    |
//!        v                                      | infectious period  | infectious period
//!    Infected --- quarantine delay elapsed --> Quarantined           | (quarantine off)
//!        |                                                           |
//!        +-----------------------------------------------------------+
//! ```
//!
//! Every clock is anchored at the day of infection, including the quarantine clock: a
//! quarantined vertex remembers when it was infected, not when it was isolated.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::parameters::ParameterSet;
use crate::random::RandomSource;

/// Simulation day. Day 0 is the day the seed vertex is infected.
pub type Day = u32;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexStatus {
    #[default]
    Susceptible,
    Infected { since: Day },
    Quarantined { infected_on: Day },
    Immune { since: Day },
    Dead,
}

/// The status of a vertex without its day stamp, for counting and display.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    Susceptible,
    Infected,
    Quarantined,
    Immune,
    Dead,
}

impl StatusKind {
    pub const ALL: [StatusKind; 5] = [
        StatusKind::Susceptible,
        StatusKind::Infected,
        StatusKind::Quarantined,
        StatusKind::Immune,
        StatusKind::Dead,
    ];
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            StatusKind::Susceptible => "susceptible",
            StatusKind::Infected => "infected",
            StatusKind::Quarantined => "quarantined",
            StatusKind::Immune => "immune",
            StatusKind::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// An entry of the infection ledger: when a vertex was infected, or that the infection
/// killed it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfectionRecord {
    InfectedOn(Day),
    Dead,
}

/// A lifecycle move selected for a vertex on a given day.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Quarantine { infected_on: Day },
    BecomeImmune,
    LoseImmunity,
}

impl VertexStatus {
    #[must_use]
    pub fn kind(&self) -> StatusKind {
        match self {
            VertexStatus::Susceptible => StatusKind::Susceptible,
            VertexStatus::Infected { .. } => StatusKind::Infected,
            VertexStatus::Quarantined { .. } => StatusKind::Quarantined,
            VertexStatus::Immune { .. } => StatusKind::Immune,
            VertexStatus::Dead => StatusKind::Dead,
        }
    }

    #[must_use]
    pub fn is_susceptible(&self) -> bool {
        matches!(self, VertexStatus::Susceptible)
    }

    /// Only infected vertices that are not quarantined spread the contagion.
    #[must_use]
    pub fn is_infectious(&self) -> bool {
        matches!(self, VertexStatus::Infected { .. })
    }

    /// Infected or quarantined: counted as part of the outbreak.
    #[must_use]
    pub fn is_active_case(&self) -> bool {
        matches!(
            self,
            VertexStatus::Infected { .. } | VertexStatus::Quarantined { .. }
        )
    }

    #[must_use]
    pub fn is_immune(&self) -> bool {
        matches!(self, VertexStatus::Immune { .. })
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        matches!(self, VertexStatus::Dead)
    }

    /// Day of infection for infected and quarantined vertices.
    #[must_use]
    pub fn infection_day(&self) -> Option<Day> {
        match *self {
            VertexStatus::Infected { since } => Some(since),
            VertexStatus::Quarantined { infected_on } => Some(infected_on),
            _ => None,
        }
    }

    /// Selects the lifecycle move for this status on `day`, if one is due.
    ///
    /// With quarantine enabled an infected vertex never becomes immune directly; it is
    /// quarantined first and becomes immune on a later evaluation.
    #[must_use]
    pub fn due_transition(&self, day: Day, parameters: &ParameterSet) -> Option<Transition> {
        match *self {
            VertexStatus::Infected { since } => match parameters.quarantine_delay {
                Some(delay) => {
                    (day >= since.saturating_add(delay)).then_some(Transition::Quarantine {
                        infected_on: since,
                    })
                }
                None => (day >= since.saturating_add(parameters.infectious_period))
                    .then_some(Transition::BecomeImmune),
            },
            VertexStatus::Quarantined { infected_on } => {
                (day >= infected_on.saturating_add(parameters.infectious_period))
                    .then_some(Transition::BecomeImmune)
            }
            VertexStatus::Immune { since } => parameters
                .immunity_duration
                .filter(|duration| day >= since.saturating_add(*duration))
                .map(|_| Transition::LoseImmunity),
            VertexStatus::Susceptible | VertexStatus::Dead => None,
        }
    }

    /// The status that results from applying `transition` on `day`.
    #[must_use]
    pub fn after(&self, transition: Transition, day: Day) -> VertexStatus {
        match transition {
            Transition::Quarantine { infected_on } => VertexStatus::Quarantined { infected_on },
            Transition::BecomeImmune => VertexStatus::Immune { since: day },
            Transition::LoseImmunity => VertexStatus::Susceptible,
        }
    }
}

/// Resolves a contact that reached a susceptible vertex on `day`: the vertex either dies or
/// becomes infected. Consumes exactly one draw from `rng`.
pub fn resolve_exposure<R: RandomSource + ?Sized>(
    rng: &mut R,
    day: Day,
    parameters: &ParameterSet,
) -> VertexStatus {
    if rng.bernoulli(parameters.death_probability) {
        VertexStatus::Dead
    } else {
        VertexStatus::Infected { since: day }
    }
}

impl Display for VertexStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VertexStatus::Susceptible | VertexStatus::Dead => write!(f, "{}", self.kind()),
            VertexStatus::Infected { since } => write!(f, "infected since day {since}"),
            VertexStatus::Quarantined { infected_on } => {
                write!(f, "quarantined (infected on day {infected_on})")
            }
            VertexStatus::Immune { since } => write!(f, "immune since day {since}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SeededRandom;

    // Returns the same draw every time.
    struct FixedDraw(f64);

    impl RandomSource for FixedDraw {
        fn uniform(&mut self) -> f64 {
            self.0
        }

        fn index(&mut self, _upper: usize) -> usize {
            0
        }
    }

    fn parameters(quarantine_delay: Option<u32>, immunity_duration: Option<u32>) -> ParameterSet {
        ParameterSet {
            infectious_period: 3,
            quarantine_delay,
            immunity_duration,
            ..ParameterSet::default()
        }
    }

    #[test]
    fn infected_becomes_immune_after_infectious_period() {
        let p = parameters(None, None);
        let status = VertexStatus::Infected { since: 2 };
        assert_eq!(status.due_transition(3, &p), None);
        assert_eq!(status.due_transition(4, &p), None);
        assert_eq!(status.due_transition(5, &p), Some(Transition::BecomeImmune));
        assert_eq!(
            status.after(Transition::BecomeImmune, 5),
            VertexStatus::Immune { since: 5 }
        );
    }

    #[test]
    fn quarantine_takes_priority_over_immunity() {
        let p = parameters(Some(1), None);
        let status = VertexStatus::Infected { since: 0 };
        // Past the infectious period, but quarantine is enabled.
        assert_eq!(
            status.due_transition(10, &p),
            Some(Transition::Quarantine { infected_on: 0 })
        );
    }

    #[test]
    fn quarantine_keeps_infection_day() {
        let p = parameters(Some(1), None);
        let status = VertexStatus::Infected { since: 4 };
        assert_eq!(status.due_transition(4, &p), None);
        let transition = status.due_transition(5, &p).unwrap();
        assert_eq!(
            status.after(transition, 5),
            VertexStatus::Quarantined { infected_on: 4 }
        );
    }

    #[test]
    fn quarantine_clock_is_anchored_at_infection() {
        let p = parameters(Some(1), None);
        let status = VertexStatus::Quarantined { infected_on: 4 };
        assert_eq!(status.due_transition(6, &p), None);
        assert_eq!(status.due_transition(7, &p), Some(Transition::BecomeImmune));
    }

    #[test]
    fn quarantined_becomes_immune_even_if_quarantine_disabled_later() {
        let p = parameters(None, None);
        let status = VertexStatus::Quarantined { infected_on: 0 };
        assert_eq!(status.due_transition(3, &p), Some(Transition::BecomeImmune));
    }

    #[test]
    fn zero_delay_quarantines_immediately() {
        let p = parameters(Some(0), None);
        let status = VertexStatus::Infected { since: 8 };
        assert_eq!(
            status.due_transition(8, &p),
            Some(Transition::Quarantine { infected_on: 8 })
        );
    }

    #[test]
    fn lifelong_immunity_never_expires() {
        let p = parameters(None, None);
        let status = VertexStatus::Immune { since: 0 };
        assert_eq!(status.due_transition(u32::MAX, &p), None);
    }

    #[test]
    fn immunity_expires() {
        let p = parameters(None, Some(4));
        let status = VertexStatus::Immune { since: 3 };
        assert_eq!(status.due_transition(6, &p), None);
        assert_eq!(status.due_transition(7, &p), Some(Transition::LoseImmunity));
        assert_eq!(
            status.after(Transition::LoseImmunity, 7),
            VertexStatus::Susceptible
        );
    }

    #[test]
    fn susceptible_and_dead_never_move_on_their_own() {
        let p = parameters(Some(0), Some(0));
        for day in [0, 1, 100] {
            assert_eq!(VertexStatus::Susceptible.due_transition(day, &p), None);
            assert_eq!(VertexStatus::Dead.due_transition(day, &p), None);
        }
    }

    #[test]
    fn clocks_do_not_overflow() {
        let p = ParameterSet {
            infectious_period: u32::MAX,
            ..ParameterSet::default()
        };
        let status = VertexStatus::Infected { since: 10 };
        assert_eq!(status.due_transition(u32::MAX - 1, &p), None);
    }

    #[test]
    fn exposure_extremes() {
        let mut rng = SeededRandom::new(42);
        let never = ParameterSet {
            death_probability: 0.0,
            ..ParameterSet::default()
        };
        let always = ParameterSet {
            death_probability: 1.0,
            ..ParameterSet::default()
        };
        for _ in 0..100 {
            assert_eq!(
                resolve_exposure(&mut rng, 3, &never),
                VertexStatus::Infected { since: 3 }
            );
            assert_eq!(resolve_exposure(&mut rng, 3, &always), VertexStatus::Dead);
        }
    }

    #[test]
    fn predicates_are_exclusive() {
        let statuses = [
            VertexStatus::Susceptible,
            VertexStatus::Infected { since: 1 },
            VertexStatus::Quarantined { infected_on: 1 },
            VertexStatus::Immune { since: 1 },
            VertexStatus::Dead,
        ];
        for status in statuses {
            let flags = [
                status.is_susceptible(),
                status.is_infectious(),
                matches!(status.kind(), StatusKind::Quarantined),
                status.is_immune(),
                status.is_dead(),
            ];
            assert_eq!(flags.iter().filter(|flag| **flag).count(), 1, "{status:?}");
        }
        let kinds: Vec<StatusKind> = statuses.iter().map(VertexStatus::kind).collect();
        assert_eq!(kinds, StatusKind::ALL.to_vec());
    }

    #[test]
    fn display() {
        assert_eq!(VertexStatus::Susceptible.to_string(), "susceptible");
        assert_eq!(
            VertexStatus::Quarantined { infected_on: 2 }.to_string(),
            "quarantined (infected on day 2)"
        );
        assert_eq!(VertexStatus::Dead.to_string(), "dead");
    }

    #[test]
    fn death_roll_is_strict() {
        let with_death = |death_probability| ParameterSet {
            death_probability,
            ..ParameterSet::default()
        };
        // A draw equal to the probability survives, so zero never kills.
        assert_eq!(
            resolve_exposure(&mut FixedDraw(0.0), 4, &with_death(0.0)),
            VertexStatus::Infected { since: 4 }
        );
        assert_eq!(
            resolve_exposure(&mut FixedDraw(0.25), 4, &with_death(0.25)),
            VertexStatus::Infected { since: 4 }
        );
        assert_eq!(
            resolve_exposure(&mut FixedDraw(0.249), 4, &with_death(0.25)),
            VertexStatus::Dead
        );
        assert_eq!(
            resolve_exposure(&mut FixedDraw(0.999), 4, &with_death(1.0)),
            VertexStatus::Dead
        );
    }
}
