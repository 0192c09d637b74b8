//! The field-augmented grid.
//!
//! Overlay samples are appended to a grid's point set, batch by batch, and a
//! scalar array aligned 1:1 with the points carries the field magnitudes.
//! The first `base_count` entries are 0.0 because original mesh nodes carry
//! no field value; everything a renderer does with `scalars[i]` for
//! `points[i]` depends on this alignment.

use serde::{Deserialize, Serialize};

use crate::field::FieldSample;
use crate::mesh::{Cell, IndexedGrid};

/// An [`IndexedGrid`] extended with overlay sample points and an aligned
/// scalar attribute array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AugmentedGrid {
    /// Base points followed by appended overlay sample positions
    pub points: Vec<[f64; 3]>,
    /// Typed cell list, unchanged from the source grid
    pub cells: Vec<Cell>,
    /// Scalar per point; `[0, base_count)` is 0.0, the rest are magnitudes
    /// in append order
    pub scalars: Vec<f64>,
    /// Number of points the grid had before any overlay was appended
    pub base_count: usize,
    /// Point indices of the appended overlay samples, in append order, for
    /// renderers that emit one point primitive per sample
    pub overlay_vertices: Vec<u32>,
}

impl AugmentedGrid {
    /// Append the given sample batches onto the grid and build the aligned
    /// scalar array.
    ///
    /// Batches are consumed in order; within a batch, records keep their
    /// order. Callers decide which batches participate (and fail upstream
    /// when none yield records); an empty batch list here degenerates to a
    /// grid whose scalars are all 0.0.
    #[must_use]
    pub fn assemble(grid: IndexedGrid, batches: &[FieldSample]) -> Self {
        let base_count = grid.points.len();
        let overlay_count: usize = batches.iter().map(Vec::len).sum();

        let mut points = grid.points;
        points.reserve(overlay_count);
        let mut scalars = vec![0.0; base_count];
        scalars.reserve(overlay_count);
        let mut overlay_vertices = Vec::with_capacity(overlay_count);

        for batch in batches {
            for record in batch {
                overlay_vertices.push(points.len() as u32);
                points.push(record.position);
                scalars.push(record.magnitude);
            }
        }

        Self {
            points,
            cells: grid.cells,
            scalars,
            base_count,
            overlay_vertices,
        }
    }

    /// Total number of points (base + overlay).
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Number of appended overlay points.
    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.points.len() - self.base_count
    }
}
