//! Overlay source selection and merge.
//!
//! The merger walks a result directory, picks the overlay sources by the
//! tissue precedence rule, decodes them, and appends their records onto the
//! grid. The precedence is deliberate upstream behavior and is reproduced
//! exactly: a gray-matter file alone wins, else a white-matter file alone,
//! else every `e_*.npy` file in sorted filename order.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use neurofield_core::{AugmentedGrid, FieldSample, IndexedGrid, Tissue};

use crate::decode::FieldSampleDecoder;

/// Errors raised by the overlay merge.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Every overlay source was empty, absent, or undecodable. Fatal: the
    /// caller must not render an all-zero surface labeled as field data.
    #[error("no overlay source in {dir} produced any field records")]
    NoOverlayData {
        /// Directory that was searched
        dir: PathBuf,
    },

    /// The result directory itself could not be scanned.
    #[error("failed to scan overlay directory {dir}: {source}")]
    Scan {
        /// Directory that failed
        dir: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Selects, decodes, and merges overlay sources onto a grid.
pub struct FieldOverlayMerger<'a> {
    decoder: &'a dyn FieldSampleDecoder,
}

impl<'a> FieldOverlayMerger<'a> {
    /// Create a merger reading sources through the given decoder.
    #[must_use]
    pub fn new(decoder: &'a dyn FieldSampleDecoder) -> Self {
        Self { decoder }
    }

    /// Merge the selected overlay sources of `tissue_dir` onto `grid`.
    ///
    /// Sources that decode empty or fail to decode are logged and skipped;
    /// the merge only fails when no source yields any record.
    ///
    /// # Errors
    ///
    /// [`OverlayError::NoOverlayData`] when nothing survives selection and
    /// decoding; [`OverlayError::Scan`] when the directory listing itself
    /// fails.
    pub fn merge(
        &self,
        grid: IndexedGrid,
        tissue_dir: &Path,
    ) -> Result<AugmentedGrid, OverlayError> {
        let sources = select_sources(tissue_dir)?;

        let mut batches: Vec<FieldSample> = Vec::with_capacity(sources.len());
        for source in &sources {
            match self.decoder.decode(source) {
                Ok(sample) if sample.is_empty() => {
                    warn!(path = %source.display(), "overlay source is empty, skipping");
                }
                Ok(sample) => {
                    debug!(path = %source.display(), records = sample.len(), "decoded overlay source");
                    batches.push(sample);
                }
                Err(e) => {
                    warn!(path = %source.display(), error = %e, "overlay source failed to decode, skipping");
                }
            }
        }

        if batches.iter().all(Vec::is_empty) {
            return Err(OverlayError::NoOverlayData {
                dir: tissue_dir.to_path_buf(),
            });
        }

        Ok(AugmentedGrid::assemble(grid, &batches))
    }

    /// Decode every tissue's sample file from `tissue_dir`, for the
    /// reporting path. Independent of the overlay precedence: all five
    /// tissues are loaded regardless of which ones the merge selected.
    /// Undecodable files degrade to empty samples with a warning.
    #[must_use]
    pub fn load_all_tissues(&self, tissue_dir: &Path) -> BTreeMap<Tissue, FieldSample> {
        Tissue::ALL
            .into_iter()
            .map(|tissue| {
                let path = tissue_dir.join(tissue.sample_filename());
                let sample = match self.decoder.decode(&path) {
                    Ok(sample) => sample,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "tissue sample failed to decode, treating as absent");
                        Vec::new()
                    }
                };
                (tissue, sample)
            })
            .collect()
    }
}

/// Apply the tissue precedence rule to a result directory.
///
/// Returns the gray-matter file alone if present, else the white-matter file
/// alone, else every `e_*.npy` file in lexicographic filename order.
fn select_sources(tissue_dir: &Path) -> Result<Vec<PathBuf>, OverlayError> {
    let gray = tissue_dir.join(Tissue::GrayMatter.sample_filename());
    if gray.is_file() {
        return Ok(vec![gray]);
    }

    let white = tissue_dir.join(Tissue::WhiteMatter.sample_filename());
    if white.is_file() {
        return Ok(vec![white]);
    }

    let entries = match tissue_dir.read_dir() {
        Ok(entries) => entries,
        // A missing directory has no sources; the caller reports the
        // resulting NoOverlayData.
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(OverlayError::Scan {
                dir: tissue_dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("e_") && name.ends_with(".npy"))
        })
        .collect();
    files.sort();
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};

    use neurofield_core::{FieldRecord, RawMesh};

    use crate::decode::{FlatFieldDecoder, FlatMeshDecoder};

    static SCRATCH_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir(tag: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "neurofield-overlay-{tag}-{}-{n}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_sample(dir: &Path, filename: &str, magnitudes: &[f64]) {
        let sample: FieldSample = magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| FieldRecord::from_row([i as f64, 0.0, 0.0, m]))
            .collect();
        fs::write(dir.join(filename), FlatFieldDecoder::encode(&sample)).unwrap();
    }

    fn unit_grid() -> IndexedGrid {
        let mesh = RawMesh {
            nodes: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            tetra_cells: vec![[0, 1, 2, 3]],
            triangle_cells: vec![],
        };
        IndexedGrid::from_mesh(&mesh).unwrap()
    }

    #[test]
    fn test_gray_matter_wins_over_white() {
        let dir = scratch_dir("gray-wins");
        write_sample(&dir, "e_gray_matter.npy", &[1.0, 2.0]);
        write_sample(&dir, "e_white_matter.npy", &[9.0, 9.0, 9.0]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let augmented = merger.merge(unit_grid(), &dir).unwrap();

        // Only the gray-matter records appear.
        assert_eq!(augmented.overlay_count(), 2);
        assert_eq!(augmented.scalars[4..], [1.0, 2.0]);
    }

    #[test]
    fn test_white_matter_used_when_gray_absent() {
        let dir = scratch_dir("white-fallback");
        write_sample(&dir, "e_white_matter.npy", &[3.0]);
        write_sample(&dir, "e_scalp.npy", &[9.0]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let augmented = merger.merge(unit_grid(), &dir).unwrap();

        assert_eq!(augmented.overlay_count(), 1);
        assert_eq!(augmented.scalars[4], 3.0);
    }

    #[test]
    fn test_fallback_uses_all_sources_in_sorted_order() {
        let dir = scratch_dir("sorted-fallback");
        write_sample(&dir, "e_csf.npy", &[1.0, 2.0]);
        write_sample(&dir, "e_bone.npy", &[5.0]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let augmented = merger.merge(unit_grid(), &dir).unwrap();

        // "e_bone.npy" sorts before "e_csf.npy".
        assert_eq!(augmented.overlay_count(), 3);
        assert_eq!(augmented.scalars[4..], [5.0, 1.0, 2.0]);
    }

    #[test]
    fn test_empty_and_malformed_sources_are_skipped() {
        let dir = scratch_dir("skip");
        write_sample(&dir, "e_bone.npy", &[]);
        fs::write(dir.join("e_csf.npy"), vec![0u8; 7]).unwrap();
        write_sample(&dir, "e_scalp.npy", &[4.0]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let augmented = merger.merge(unit_grid(), &dir).unwrap();

        assert_eq!(augmented.overlay_count(), 1);
        assert_eq!(augmented.scalars[4], 4.0);
    }

    #[test]
    fn test_no_data_anywhere_fails() {
        let dir = scratch_dir("no-data");
        write_sample(&dir, "e_bone.npy", &[]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let err = merger.merge(unit_grid(), &dir).unwrap_err();
        assert!(matches!(err, OverlayError::NoOverlayData { .. }));
    }

    #[test]
    fn test_missing_directory_reports_no_data() {
        let dir = scratch_dir("missing").join("does-not-exist");

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let err = merger.merge(unit_grid(), &dir).unwrap_err();
        assert!(matches!(err, OverlayError::NoOverlayData { .. }));
    }

    #[test]
    fn test_end_to_end_unit_tetrahedron() {
        // Mesh with 4 nodes and one tetra cell, one tissue file with 2
        // records: 6 points, scalars [0,0,0,0,m1,m2], cells untouched.
        let dir = scratch_dir("end-to-end");
        let mesh = RawMesh {
            nodes: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            tetra_cells: vec![[0, 1, 2, 3]],
            triangle_cells: vec![],
        };
        fs::write(dir.join("sub-control.msh"), FlatMeshDecoder::encode(&mesh)).unwrap();
        write_sample(&dir, "e_gray_matter.npy", &[0.5, 0.9]);

        use crate::decode::MeshDecoder;
        let decoded = FlatMeshDecoder.decode(&dir.join("sub-control.msh")).unwrap();
        let grid = IndexedGrid::from_mesh(&decoded).unwrap();

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let augmented = merger.merge(grid, &dir).unwrap();

        assert_eq!(augmented.point_count(), 6);
        assert_eq!(augmented.scalars, vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.9]);
        assert_eq!(
            augmented.cells,
            vec![neurofield_core::Cell::Tetra([0, 1, 2, 3])]
        );
    }

    #[test]
    fn test_load_all_tissues_ignores_precedence() {
        let dir = scratch_dir("all-tissues");
        write_sample(&dir, "e_gray_matter.npy", &[1.0]);
        write_sample(&dir, "e_white_matter.npy", &[2.0, 3.0]);

        let decoder = FlatFieldDecoder;
        let merger = FieldOverlayMerger::new(&decoder);
        let samples = merger.load_all_tissues(&dir);

        assert_eq!(samples.len(), Tissue::ALL.len());
        assert_eq!(samples[&Tissue::GrayMatter].len(), 1);
        assert_eq!(samples[&Tissue::WhiteMatter].len(), 2);
        assert!(samples[&Tissue::Scalp].is_empty());
    }
}
