//! Hand-off types for a rendering collaborator.
//!
//! The renderer itself lives outside this crate; what crosses the boundary
//! is a [`RenderPacket`]: the augmented grid, its color transfer function,
//! and the viewer configuration. Configuration travels explicitly with the
//! packet instead of through process-wide state.

use serde::{Deserialize, Serialize};

use crate::color::ColorTransferFunction;
use crate::overlay::AugmentedGrid;

/// Scalar-bar (legend) configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalarBarSettings {
    /// Legend title
    pub title: String,
    /// Number of tick labels along the bar
    pub label_count: u32,
}

impl Default for ScalarBarSettings {
    fn default() -> Self {
        Self {
            title: "E-field (V/m)".to_string(),
            label_count: 4,
        }
    }
}

/// Viewer configuration handed to the rendering collaborator at
/// construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewerSettings {
    /// Background color (r, g, b)
    pub background: [f32; 3],
    /// Enable depth peeling for correct translucency
    pub depth_peeling: bool,
    /// Maximum number of depth-peeling passes
    pub maximum_peels: u32,
    /// Occlusion ratio at which peeling stops early
    pub occlusion_ratio: f32,
    /// Scalar-bar configuration
    pub scalar_bar: ScalarBarSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            background: [0.1, 0.1, 0.2],
            depth_peeling: true,
            maximum_peels: 100,
            occlusion_ratio: 0.1,
            scalar_bar: ScalarBarSettings::default(),
        }
    }
}

/// Everything a renderer needs for one subject/result pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderPacket {
    /// The field-augmented grid
    pub grid: AugmentedGrid,
    /// Color transfer function calibrated to the grid's scalars
    pub color: ColorTransferFunction,
    /// Viewer configuration
    pub settings: ViewerSettings,
}

/// Interleaved vertex format for GPU upload: position plus the scalar the
/// shader maps through the lookup table.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ScalarVertex {
    /// Position (x, y, z)
    pub position: [f32; 3],
    /// Field scalar for color lookup
    pub scalar: f32,
}

impl RenderPacket {
    /// Flatten the grid into an interleaved vertex buffer, one vertex per
    /// point, scalars aligned by index.
    #[must_use]
    pub fn scalar_vertices(&self) -> Vec<ScalarVertex> {
        self.grid
            .points
            .iter()
            .zip(&self.grid.scalars)
            .map(|(p, &s)| ScalarVertex {
                position: [p[0] as f32, p[1] as f32, p[2] as f32],
                scalar: s as f32,
            })
            .collect()
    }
}
