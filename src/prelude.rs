pub use crate::engine::{step, Simulation};
pub use crate::error::ContagionError;
pub use crate::graph::{Graph, Vertex};
pub use crate::loader::{load_edge_list, load_edges};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::parameters::{ParameterSet, SharedParameters};
pub use crate::random::{RandomSource, SeededRandom};
pub use crate::report::{CsvReport, ReportLog, StepReport, StepSink};
pub use crate::runner::{AutoRunner, RunOutcome, Session, StopReason};
pub use crate::state::SimulationState;
pub use crate::status::{Day, StatusKind, VertexStatus};
