//! Electric-field sample records.

use serde::{Deserialize, Serialize};

/// A spatial point annotated with a field magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Sample position (x, y, z) in subject space, millimetres
    pub position: [f64; 3],
    /// Electric-field magnitude at the position, V/m
    pub magnitude: f64,
}

impl FieldRecord {
    /// Create a record from a raw (x, y, z, magnitude) row.
    #[must_use]
    pub fn from_row(row: [f64; 4]) -> Self {
        Self {
            position: [row[0], row[1], row[2]],
            magnitude: row[3],
        }
    }
}

/// Ordered sample sequence for one tissue. Empty means the tissue is absent
/// from the result set.
pub type FieldSample = Vec<FieldRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_row() {
        let record = FieldRecord::from_row([1.0, 2.0, 3.0, 0.5]);
        assert_eq!(record.position, [1.0, 2.0, 3.0]);
        assert_eq!(record.magnitude, 0.5);
    }
}
