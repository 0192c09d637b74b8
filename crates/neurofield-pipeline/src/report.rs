//! Per-tissue statistics reporting.
//!
//! Renders the summary table shown in the results view and exports the same
//! data as JSON. Undefined statistics print as the literal `N/A`; a numeric
//! placeholder would read as a real measurement.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use neurofield_core::{Tissue, TissueStatistics};

use crate::session::SessionParams;

/// A complete analysis report for one session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldReport {
    /// The parameter selection that produced the results, when known
    pub params: Option<SessionParams>,
    /// Per-tissue field statistics, in canonical tissue order
    pub statistics: BTreeMap<Tissue, TissueStatistics>,
}

impl FieldReport {
    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render the statistics as a fixed-width text table.
    #[must_use]
    pub fn render_table(&self) -> String {
        render_statistics_table(&self.statistics)
    }
}

/// Format one statistic for display: scientific notation or `N/A`.
#[must_use]
pub fn format_stat(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.3e}"),
        None => "N/A".to_string(),
    }
}

/// Render a per-tissue statistics table (V/m).
#[must_use]
pub fn render_statistics_table(statistics: &BTreeMap<Tissue, TissueStatistics>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<14} {:>12} {:>12} {:>12} {:>12}",
        "Tissue", "min", "max", "mean", "std"
    );
    for tissue in Tissue::ALL {
        let stats = statistics.get(&tissue).copied().unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<14} {:>12} {:>12} {:>12} {:>12}",
            tissue.display_name(),
            format_stat(stats.min),
            format_stat(stats.max),
            format_stat(stats.mean),
            format_stat(stats.std_dev),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use neurofield_core::stats;
    use neurofield_core::FieldRecord;

    #[test]
    fn test_format_stat() {
        assert_eq!(format_stat(None), "N/A");
        assert_eq!(format_stat(Some(2.0)), "2.000e0");
    }

    #[test]
    fn test_table_has_na_for_empty_tissues() {
        let mut samples = BTreeMap::new();
        samples.insert(
            Tissue::GrayMatter,
            vec![
                FieldRecord::from_row([0.0, 0.0, 0.0, 1.0]),
                FieldRecord::from_row([0.0, 0.0, 0.0, 3.0]),
            ],
        );
        let statistics = stats::summarize(&samples);
        let table = render_statistics_table(&statistics);

        let lines: Vec<&str> = table.lines().collect();
        // Header plus one row per tissue.
        assert_eq!(lines.len(), 1 + Tissue::ALL.len());
        let scalp_row = lines[1];
        assert!(scalp_row.starts_with("Scalp"));
        assert!(scalp_row.contains("N/A"));
        let gray_row = lines
            .iter()
            .find(|l| l.starts_with("Gray Matter"))
            .unwrap();
        assert!(gray_row.contains("2.000e0"));
        assert!(!gray_row.contains("N/A"));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut statistics = BTreeMap::new();
        statistics.insert(
            Tissue::Csf,
            TissueStatistics {
                min: Some(0.1),
                max: Some(0.9),
                mean: Some(0.5),
                std_dev: Some(0.2),
            },
        );
        let report = FieldReport {
            params: None,
            statistics,
        };

        let json = report.to_json().unwrap();
        let parsed: FieldReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.statistics[&Tissue::Csf].mean, Some(0.5));
    }
}
