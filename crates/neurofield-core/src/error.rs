//! Error types for grid assembly.

use thiserror::Error;

/// Errors raised while building a grid from decoded mesh data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// The decoded mesh contains no nodes.
    #[error("mesh contains no nodes")]
    EmptyMesh,

    /// A cell references a node index past the end of the node list.
    #[error("{cell_kind} cell {cell} references node {node}, but only {node_count} nodes exist")]
    CellIndexOutOfRange {
        /// Cell kind ("tetra" or "triangle")
        cell_kind: &'static str,
        /// Index of the offending cell within its list
        cell: usize,
        /// The out-of-range node index
        node: u32,
        /// Number of nodes in the mesh
        node_count: usize,
    },
}

/// Result type for grid assembly.
pub type GridResult<T> = Result<T, GridError>;
