//! Per-tissue field-magnitude statistics.
//!
//! Statistics are computed over each tissue's raw magnitude column,
//! independently of the merged grid. An empty sample sequence produces
//! undefined values, surfaced to display layers as "N/A" rather than a
//! numeric placeholder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::FieldSample;
use crate::tissue::Tissue;

/// Summary of one tissue's magnitude column. All four fields are `None`
/// when the tissue has no samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TissueStatistics {
    /// Minimum magnitude
    pub min: Option<f64>,
    /// Maximum magnitude
    pub max: Option<f64>,
    /// Arithmetic mean
    pub mean: Option<f64>,
    /// Population standard deviation
    pub std_dev: Option<f64>,
}

impl TissueStatistics {
    /// Compute statistics over a sample sequence. Never fails; an empty
    /// sequence yields all-`None`.
    #[must_use]
    pub fn from_sample(sample: &FieldSample) -> Self {
        if sample.is_empty() {
            return Self::default();
        }

        let n = sample.len() as f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for record in sample {
            min = min.min(record.magnitude);
            max = max.max(record.magnitude);
            sum += record.magnitude;
        }
        let mean = sum / n;

        let variance = sample
            .iter()
            .map(|r| {
                let d = r.magnitude - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        Self {
            min: Some(min),
            max: Some(max),
            mean: Some(mean),
            std_dev: Some(variance.sqrt()),
        }
    }

    /// Whether the statistics carry values (the tissue had samples).
    #[must_use]
    pub fn is_defined(&self) -> bool {
        self.min.is_some()
    }
}

/// Summarize every tissue's magnitude column.
///
/// Tissues missing from the input map are reported as undefined, so the
/// result always carries one entry per [`Tissue`], in canonical order.
#[must_use]
pub fn summarize(samples: &BTreeMap<Tissue, FieldSample>) -> BTreeMap<Tissue, TissueStatistics> {
    Tissue::ALL
        .into_iter()
        .map(|tissue| {
            let stats = samples
                .get(&tissue)
                .map_or_else(TissueStatistics::default, |s| {
                    TissueStatistics::from_sample(s)
                });
            (tissue, stats)
        })
        .collect()
}
