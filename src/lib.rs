//! A day-by-day contagion simulator over a social graph
//!
//! `ixa-contagion` advances an outbreak one discrete day per step over an undirected graph of
//! named vertices. Every vertex carries exactly one epidemiological status (susceptible,
//! infected, quarantined, immune or dead), and each step:
//! * lets every infectious vertex on the frontier attempt a randomized number of contacts among
//!   its neighbors, bounded by its degree,
//! * rolls for death on every susceptible contact that was reached,
//! * moves vertices through quarantine, immunity and back to susceptibility once the
//!   configured number of days has elapsed.
//!
//! The pieces are layered leaves-first:
//! * [`graph::Graph`] holds the adjacency and never changes during a run.
//! * [`state::SimulationState`] owns the per-vertex status map, the infectious queue and the
//!   aggregate counters.
//! * [`engine::step`] is the pure function from one day to the next, driven by a
//!   [`parameters::ParameterSet`] and an injected [`random::RandomSource`].
//! * [`engine::Simulation`], [`runner`] and [`console`] drive steps for an operator, either one
//!   at a time or automatically until the outbreak burns out.
//!
//! ```rust
//! use ixa_contagion::prelude::*;
//!
//! let graph = Graph::from_edges([("A", "B"), ("B", "C")]);
//! let mut simulation = Simulation::new(graph, "A").unwrap();
//! let mut rng = SeededRandom::new(42);
//! let report = simulation.step(&ParameterSet::default(), &mut rng).unwrap();
//! assert_eq!(report.day, 1);
//! ```
pub mod engine;
pub mod error;
pub mod frontier;
pub mod graph;
pub mod hashing;
pub mod loader;
pub mod log;
pub mod parameters;
pub mod random;
pub mod report;
pub mod runner;
pub mod state;
pub mod status;

#[cfg(feature = "console")]
pub mod console;

pub mod prelude;

pub use engine::{step, Simulation};
pub use error::ContagionError;
pub use graph::{Graph, Vertex};
pub use hashing::{HashMap, HashMapExt};
pub use parameters::{ParameterSet, SharedParameters};
pub use random::{RandomSource, SeededRandom};
pub use report::{StepReport, StepSink};
pub use state::SimulationState;
pub use status::{StatusKind, VertexStatus};

// Re-exports for use in macros and by model code
pub use crate::log::{debug, error, info, trace, warn, LevelFilter};
pub use rand;
