//! Raw mesh data and the indexed grid built from it.
//!
//! A [`RawMesh`] is what the mesh decoder hands over: node coordinates plus
//! tetrahedral and triangular cells referencing them by index. The
//! [`IndexedGrid`] is the renderable form: the same points and cells in one
//! typed list, tetra cells first, indices untouched.

use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Decoded mesh data, immutable once decoded.
///
/// Node index space is 0-based and contiguous; every cell index must be
/// `< nodes.len()`. [`RawMesh::validate`] checks that invariant for callers
/// that want it checked; grid building itself trusts its input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMesh {
    /// Node coordinates; index is the node id
    pub nodes: Vec<[f64; 3]>,
    /// Tetrahedral cells as node-index 4-tuples
    pub tetra_cells: Vec<[u32; 4]>,
    /// Triangular cells as node-index 3-tuples
    pub triangle_cells: Vec<[u32; 3]>,
}

impl RawMesh {
    /// Check that every cell index references an existing node.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::CellIndexOutOfRange`] naming the first offending
    /// cell.
    pub fn validate(&self) -> GridResult<()> {
        let node_count = self.nodes.len();
        for (cell, indices) in self.tetra_cells.iter().enumerate() {
            for &node in indices {
                if node as usize >= node_count {
                    return Err(GridError::CellIndexOutOfRange {
                        cell_kind: "tetra",
                        cell,
                        node,
                        node_count,
                    });
                }
            }
        }
        for (cell, indices) in self.triangle_cells.iter().enumerate() {
            for &node in indices {
                if node as usize >= node_count {
                    return Err(GridError::CellIndexOutOfRange {
                        cell_kind: "triangle",
                        cell,
                        node,
                        node_count,
                    });
                }
            }
        }
        Ok(())
    }
}

/// A cell in the typed cell list of a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    /// Tetrahedron referencing four point indices
    Tetra([u32; 4]),
    /// Triangle referencing three point indices
    Triangle([u32; 3]),
}

/// Indexed renderable grid built from a [`RawMesh`].
///
/// Point index equals node index; the cell list holds all tetra cells
/// followed by all triangle cells, each referencing the original node
/// indices unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedGrid {
    /// Point coordinates, a direct copy of the mesh nodes
    pub points: Vec<[f64; 3]>,
    /// Typed cell list, tetra cells first
    pub cells: Vec<Cell>,
}

impl IndexedGrid {
    /// Build the grid from decoded mesh data.
    ///
    /// Deterministic and pure; node order and cell indices pass through
    /// unchanged. Out-of-range cell indices are a caller error and are not
    /// re-checked here.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyMesh`] if the mesh has no nodes.
    pub fn from_mesh(mesh: &RawMesh) -> GridResult<Self> {
        if mesh.nodes.is_empty() {
            return Err(GridError::EmptyMesh);
        }

        let mut cells = Vec::with_capacity(mesh.tetra_cells.len() + mesh.triangle_cells.len());
        cells.extend(mesh.tetra_cells.iter().copied().map(Cell::Tetra));
        cells.extend(mesh.triangle_cells.iter().copied().map(Cell::Triangle));

        Ok(Self {
            points: mesh.nodes.clone(),
            cells,
        })
    }

    /// Number of points in the grid.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of tetrahedral cells.
    #[must_use]
    pub fn tetra_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, Cell::Tetra(_)))
            .count()
    }

    /// Number of triangular cells.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| matches!(c, Cell::Triangle(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tetrahedron() -> RawMesh {
        RawMesh {
            nodes: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            tetra_cells: vec![[0, 1, 2, 3]],
            triangle_cells: vec![[0, 1, 2]],
        }
    }

    #[test]
    fn test_build_preserves_points_and_indices() {
        let mesh = unit_tetrahedron();
        let grid = IndexedGrid::from_mesh(&mesh).unwrap();

        assert_eq!(grid.points.len(), mesh.nodes.len());
        assert_eq!(grid.points, mesh.nodes);
        assert_eq!(
            grid.cells,
            vec![Cell::Tetra([0, 1, 2, 3]), Cell::Triangle([0, 1, 2])]
        );
    }

    #[test]
    fn test_tetra_cells_precede_triangles() {
        let mut mesh = unit_tetrahedron();
        mesh.triangle_cells.push([1, 2, 3]);
        let grid = IndexedGrid::from_mesh(&mesh).unwrap();

        assert_eq!(grid.tetra_count(), 1);
        assert_eq!(grid.triangle_count(), 2);
        assert!(matches!(grid.cells[0], Cell::Tetra(_)));
        assert!(matches!(grid.cells[1], Cell::Triangle(_)));
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let mesh = RawMesh::default();
        assert_eq!(IndexedGrid::from_mesh(&mesh), Err(GridError::EmptyMesh));
    }

    #[test]
    fn test_validate_catches_out_of_range_index() {
        let mut mesh = unit_tetrahedron();
        mesh.tetra_cells.push([0, 1, 2, 9]);

        let err = mesh.validate().unwrap_err();
        assert!(matches!(
            err,
            GridError::CellIndexOutOfRange {
                cell_kind: "tetra",
                cell: 1,
                node: 9,
                node_count: 4,
            }
        ));
    }

    #[test]
    fn test_validate_accepts_valid_mesh() {
        assert!(unit_tetrahedron().validate().is_ok());
    }
}
