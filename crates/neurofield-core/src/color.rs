//! Color transfer function for field magnitudes.
//!
//! A fixed 256-entry RGBA+opacity lookup table over a deliberately narrowed
//! domain: the upper bound is `max * 0.3`, not the true maximum, so that
//! subtle variation in the common low/mid range stays visible while the few
//! hot voxels saturate into the top of the ramp.

use serde::{Deserialize, Serialize};

/// Number of entries in the lookup table.
pub const TABLE_SIZE: usize = 256;

/// Fraction of the true maximum used as the table's upper domain bound.
const CLAMP_FRACTION: f64 = 0.3;

/// One table entry: color plus opacity, each in `[0.0, 1.0]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
    /// Opacity (alpha)
    pub opacity: f32,
}

/// A 256-entry piecewise color lookup table with its scalar domain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorTransferFunction {
    entries: Vec<Rgba>,
    min_scalar: f64,
    clamp_max: f64,
}

impl ColorTransferFunction {
    /// Build the table calibrated to the given scalar array.
    ///
    /// The domain is `[min, max * 0.3]`. A degenerate all-zero array yields
    /// a zero-width domain; the table is still built.
    #[must_use]
    pub fn build(scalars: &[f64]) -> Self {
        let min_scalar = scalars.iter().copied().fold(f64::INFINITY, f64::min);
        let max_scalar = scalars.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (min_scalar, max_scalar) = if scalars.is_empty() {
            (0.0, 0.0)
        } else {
            (min_scalar, max_scalar)
        };

        let entries = (0..TABLE_SIZE)
            .map(|i| sample_ramp(i as f64 / (TABLE_SIZE - 1) as f64))
            .collect();

        Self {
            entries,
            min_scalar,
            clamp_max: max_scalar * CLAMP_FRACTION,
        }
    }

    /// The table entries, exactly [`TABLE_SIZE`] of them.
    #[must_use]
    pub fn entries(&self) -> &[Rgba] {
        &self.entries
    }

    /// The scalar domain `(min, clamp_max)` the table maps.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        (self.min_scalar, self.clamp_max)
    }

    /// Map a scalar value to its table entry.
    ///
    /// Values above `clamp_max` saturate to the top entry; values below the
    /// minimum clamp to entry 0. A zero-width domain maps at-or-below-min to
    /// entry 0 and everything else to the top.
    #[must_use]
    pub fn lookup(&self, value: f64) -> &Rgba {
        let span = self.clamp_max - self.min_scalar;
        let t = if span > 0.0 {
            ((value - self.min_scalar) / span).clamp(0.0, 1.0)
        } else if value <= self.min_scalar {
            0.0
        } else {
            1.0
        };
        let index = (t * (TABLE_SIZE - 1) as f64).round() as usize;
        &self.entries[index]
    }
}

/// Sample the piecewise ramp at parameter `t` in `[0, 1]`.
///
/// Near-zero band is ghosted white; then a grey-to-blue ramp up to the
/// midpoint; then yellow-to-red for the upper half. The two ramps meet
/// continuously at (1, 1, 0).
fn sample_ramp(t: f64) -> Rgba {
    if t < 0.05 {
        Rgba {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            opacity: 0.2,
        }
    } else if t < 0.5 {
        let f = ((t - 0.05) / 0.45) as f32;
        Rgba {
            r: f,
            g: f,
            b: 1.0 - f,
            opacity: 1.0,
        }
    } else {
        let f = ((t - 0.5) / 0.5) as f32;
        Rgba {
            r: 1.0,
            g: 1.0 - f,
            b: 0.0,
            opacity: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_256_entries() {
        let ctf = ColorTransferFunction::build(&[0.0, 1.0, 2.0]);
        assert_eq!(ctf.entries().len(), TABLE_SIZE);
    }

    #[test]
    fn test_near_zero_band_is_ghosted() {
        let ctf = ColorTransferFunction::build(&[0.0, 10.0]);
        let first = ctf.entries()[0];
        assert_eq!(first.opacity, 0.2);
        assert_eq!((first.r, first.g, first.b), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_domain_is_clamped_to_third_of_max() {
        let ctf = ColorTransferFunction::build(&[0.0, 0.0, 10.0]);
        let (min, max) = ctf.domain();
        assert_eq!(min, 0.0);
        assert!((max - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ramps_continuous_at_seam() {
        // Last blue-ramp entry approaches (1, 1, 0); first red-ramp entry
        // starts there.
        let ctf = ColorTransferFunction::build(&[0.0, 1.0]);
        let below = ctf.entries()[127];
        let above = ctf.entries()[128];

        assert!(below.r > 0.99 && below.g > 0.99 && below.b < 0.01);
        assert!(above.r == 1.0 && above.g > 0.99 && above.b == 0.0);
    }

    #[test]
    fn test_top_entry_is_red() {
        let ctf = ColorTransferFunction::build(&[0.0, 1.0]);
        let top = ctf.entries()[TABLE_SIZE - 1];
        assert_eq!((top.r, top.g, top.b), (1.0, 0.0, 0.0));
        assert_eq!(top.opacity, 1.0);
    }

    #[test]
    fn test_lookup_saturates_above_clamp() {
        let ctf = ColorTransferFunction::build(&[0.0, 10.0]);
        // True max is 10 but the domain tops out at 3; anything above
        // saturates to the top entry.
        assert_eq!(ctf.lookup(10.0), &ctf.entries()[TABLE_SIZE - 1]);
        assert_eq!(ctf.lookup(3.0), &ctf.entries()[TABLE_SIZE - 1]);
        assert_eq!(ctf.lookup(0.0), &ctf.entries()[0]);
    }

    #[test]
    fn test_degenerate_all_zero_scalars() {
        let ctf = ColorTransferFunction::build(&[0.0, 0.0, 0.0]);
        let (min, max) = ctf.domain();
        assert_eq!(min, 0.0);
        assert_eq!(max, 0.0);
        assert_eq!(ctf.entries().len(), TABLE_SIZE);
        assert_eq!(ctf.lookup(0.0), &ctf.entries()[0]);
    }
}
