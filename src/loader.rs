//! Loading a [`Graph`] from an edge list.
//!
//! The edge list is a CSV file with a `v1,v2` header and one undirected edge per row:
//!
//! ```text
//! v1,v2
//! alice,bob
//! bob,carol
//! ```
//!
//! Surrounding whitespace is trimmed. Repeated edges (in either direction) and self-loops are
//! accepted and ignored, as they are by [`Graph::add_edge`].
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{info, trace};
use serde::Deserialize;

use crate::error::ContagionError;
use crate::graph::{Graph, Vertex};

#[derive(Deserialize, Debug)]
struct EdgeRecord {
    v1: Vertex,
    v2: Vertex,
}

/// Reads an edge list from `reader`.
///
/// # Errors
///
/// Returns `ContagionError::CsvError` for a missing column or a malformed row, and
/// `ContagionError::ContagionError` for a row with an empty vertex name.
pub fn load_edges<R: Read>(reader: R) -> Result<Graph, ContagionError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut graph = Graph::new();
    for (row, record) in reader.deserialize::<EdgeRecord>().enumerate() {
        let record = record?;
        if record.v1.is_empty() || record.v2.is_empty() {
            // Row 1 is the header.
            return Err(ContagionError::ContagionError(format!(
                "empty vertex name on line {}",
                row + 2
            )));
        }
        trace!("edge {} - {}", record.v1, record.v2);
        graph.add_edge(&record.v1, &record.v2);
    }
    Ok(graph)
}

/// Reads an edge list from the CSV file at `path`.
///
/// # Errors
///
/// Returns `ContagionError::IoError` if the file cannot be opened, and the errors of
/// [`load_edges`] otherwise.
pub fn load_edge_list(path: &Path) -> Result<Graph, ContagionError> {
    let file = File::open(path)?;
    let graph = load_edges(file)?;
    info!(
        "loaded {} vertices and {} edges from {}",
        graph.vertex_count(),
        graph.edge_count(),
        path.display()
    );
    Ok(graph)
}
