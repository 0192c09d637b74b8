//! The non-blocking load pipeline.
//!
//! One worker task per load request. Each instance walks
//! `MeshLoading → OverlayMerging → Ready`, with `Failed` reachable from
//! either working state, and reports progress and the terminal outcome as
//! events on a single channel owned by the pipeline. The two heavy stages
//! (mesh decode+build, overlay decode+merge) are blocking from the worker's
//! perspective and run on the blocking pool.
//!
//! A second request issued while one is in flight does not cancel anything:
//! the older worker runs to completion, and its completion is reported as
//! `Superseded` because each instance carries a monotonically increasing id
//! checked against the latest requested id at publish time. Newer state is
//! never overwritten by a stale completion.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use neurofield_core::stats::{self, TissueStatistics};
use neurofield_core::{AugmentedGrid, ColorTransferFunction, GridError, IndexedGrid, Tissue};

use crate::decode::{FieldSampleDecoder, MeshDecodeError, MeshDecoder};
use crate::overlay::{FieldOverlayMerger, OverlayError};

/// Capacity of the pipeline event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Errors
// ============================================================================

/// Fatal errors of one pipeline instance.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The mesh file could not be decoded.
    #[error("mesh decode failed: {0}")]
    MeshDecode(#[from] MeshDecodeError),

    /// The decoded mesh could not be turned into a grid.
    #[error("grid assembly failed: {0}")]
    Grid(#[from] GridError),

    /// The overlay merge produced no data.
    #[error("overlay merge failed: {0}")]
    Overlay(#[from] OverlayError),

    /// A worker stage terminated abnormally.
    #[error("worker task failed: {reason}")]
    Worker {
        /// Description of the failure
        reason: String,
    },
}

// ============================================================================
// Requests, results, events
// ============================================================================

/// A load request: where the mesh lives and which result directory holds
/// the tissue sample files.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    /// Path to the subject mesh file
    pub mesh_path: PathBuf,
    /// Directory containing the per-tissue sample files
    pub tissue_dir: PathBuf,
}

/// States a pipeline instance moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// No work requested yet
    Idle,
    /// Decoding the mesh and building the indexed grid
    MeshLoading,
    /// Decoding tissue samples and merging the overlay
    OverlayMerging,
    /// Terminal: result published
    Ready,
    /// Terminal: instance failed
    Failed,
}

/// The published result of one successful load.
#[derive(Clone, Debug)]
pub struct LoadResult {
    /// Instance id of the load that produced this result
    pub instance: u64,
    /// The field-augmented grid
    pub grid: AugmentedGrid,
    /// Color transfer function calibrated to the grid's scalars
    pub color: ColorTransferFunction,
    /// Per-tissue statistics over all five tissues of the same directory
    pub statistics: BTreeMap<Tissue, TissueStatistics>,
}

/// Events emitted by the pipeline.
#[derive(Debug)]
pub enum PipelineEvent {
    /// An instance entered a working state.
    StateChanged {
        /// Instance id
        instance: u64,
        /// The state entered
        state: LoadState,
    },

    /// An instance completed and is still the latest requested one.
    Ready(Box<LoadResult>),

    /// An instance completed after a newer request was issued; its outcome
    /// was discarded.
    Superseded {
        /// Instance id of the stale load
        instance: u64,
    },

    /// An instance failed while still the latest requested one.
    Failed {
        /// Instance id
        instance: u64,
        /// The error that stopped it
        error: PipelineError,
    },
}

// ============================================================================
// Pipeline
// ============================================================================

/// Orchestrates load requests across worker tasks and funnels their
/// completions into one event stream.
///
/// Must be created and driven inside a tokio runtime.
pub struct LoadPipeline {
    mesh_decoder: Arc<dyn MeshDecoder>,
    field_decoder: Arc<dyn FieldSampleDecoder>,
    latest: Arc<AtomicU64>,
    next_instance: u64,
    event_tx: mpsc::Sender<PipelineEvent>,
    event_rx: mpsc::Receiver<PipelineEvent>,
}

impl LoadPipeline {
    /// Create a pipeline reading inputs through the given decoders.
    #[must_use]
    pub fn new(
        mesh_decoder: Arc<dyn MeshDecoder>,
        field_decoder: Arc<dyn FieldSampleDecoder>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            mesh_decoder,
            field_decoder,
            latest: Arc::new(AtomicU64::new(0)),
            next_instance: 0,
            event_tx,
            event_rx,
        }
    }

    /// Issue a load request and return its instance id.
    ///
    /// An in-flight older request keeps running; its completion will be
    /// reported as [`PipelineEvent::Superseded`].
    pub fn request_load(&mut self, request: LoadRequest) -> u64 {
        self.next_instance += 1;
        let instance = self.next_instance;
        self.latest.store(instance, Ordering::SeqCst);

        info!(
            instance,
            mesh = %request.mesh_path.display(),
            tissue_dir = %request.tissue_dir.display(),
            "load requested"
        );

        let worker = Worker {
            instance,
            request,
            mesh_decoder: Arc::clone(&self.mesh_decoder),
            field_decoder: Arc::clone(&self.field_decoder),
            latest: Arc::clone(&self.latest),
            event_tx: self.event_tx.clone(),
        };
        tokio::spawn(worker.run());

        instance
    }

    /// Receive the next pipeline event.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.event_rx.recv().await
    }

    /// Id of the most recently requested instance.
    #[must_use]
    pub fn latest_instance(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// One load instance's private state.
struct Worker {
    instance: u64,
    request: LoadRequest,
    mesh_decoder: Arc<dyn MeshDecoder>,
    field_decoder: Arc<dyn FieldSampleDecoder>,
    latest: Arc<AtomicU64>,
    event_tx: mpsc::Sender<PipelineEvent>,
}

impl Worker {
    async fn run(self) {
        let outcome = self.stages().await;
        self.publish(outcome).await;
    }

    /// The two blocking stages, in order. Overlay merging must not start
    /// before the grid exists: the merge needs the base point count.
    async fn stages(&self) -> Result<LoadResult, PipelineError> {
        self.emit_state(LoadState::MeshLoading).await;

        let mesh_decoder = Arc::clone(&self.mesh_decoder);
        let mesh_path = self.request.mesh_path.clone();
        let grid = run_blocking(move || -> Result<IndexedGrid, PipelineError> {
            let mesh = mesh_decoder.decode(&mesh_path)?;
            Ok(IndexedGrid::from_mesh(&mesh)?)
        })
        .await?;

        self.emit_state(LoadState::OverlayMerging).await;

        let field_decoder = Arc::clone(&self.field_decoder);
        let tissue_dir = self.request.tissue_dir.clone();
        let instance = self.instance;
        run_blocking(move || -> Result<LoadResult, PipelineError> {
            let merger = FieldOverlayMerger::new(&*field_decoder);
            let augmented = merger.merge(grid, &tissue_dir)?;
            let color = ColorTransferFunction::build(&augmented.scalars);
            let samples = merger.load_all_tissues(&tissue_dir);
            let statistics = stats::summarize(&samples);
            Ok(LoadResult {
                instance,
                grid: augmented,
                color,
                statistics,
            })
        })
        .await
    }

    /// Publish the terminal outcome, unless a newer request has been issued
    /// in the meantime.
    async fn publish(&self, outcome: Result<LoadResult, PipelineError>) {
        if self.latest.load(Ordering::SeqCst) != self.instance {
            warn!(instance = self.instance, "load superseded, discarding outcome");
            let _ = self
                .event_tx
                .send(PipelineEvent::Superseded {
                    instance: self.instance,
                })
                .await;
            return;
        }

        match outcome {
            Ok(result) => {
                info!(
                    instance = self.instance,
                    points = result.grid.point_count(),
                    overlay = result.grid.overlay_count(),
                    "load ready"
                );
                let _ = self.event_tx.send(PipelineEvent::Ready(Box::new(result))).await;
            }
            Err(error) => {
                warn!(instance = self.instance, error = %error, "load failed");
                let _ = self
                    .event_tx
                    .send(PipelineEvent::Failed {
                        instance: self.instance,
                        error,
                    })
                    .await;
            }
        }
    }

    async fn emit_state(&self, state: LoadState) {
        let _ = self
            .event_tx
            .send(PipelineEvent::StateChanged {
                instance: self.instance,
                state,
            })
            .await;
    }
}

/// Run a blocking closure on the blocking pool, folding an abnormal task
/// termination into a pipeline error.
async fn run_blocking<T, F>(f: F) -> Result<T, PipelineError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(join_error) => Err(PipelineError::Worker {
            reason: join_error.to_string(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::AtomicU32;

    use neurofield_core::{FieldRecord, FieldSample, RawMesh};

    use crate::decode::{FlatFieldDecoder, FlatMeshDecoder};

    static SCRATCH_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir(tag: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "neurofield-pipeline-{tag}-{}-{n}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_subject(dir: &Path) {
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

        let sample: FieldSample = vec![
            FieldRecord::from_row([2.0, 0.0, 0.0, 0.4]),
            FieldRecord::from_row([3.0, 0.0, 0.0, 0.8]),
        ];
        fs::write(
            dir.join("e_gray_matter.npy"),
            FlatFieldDecoder::encode(&sample),
        )
        .unwrap();
    }

    fn pipeline() -> LoadPipeline {
        LoadPipeline::new(Arc::new(FlatMeshDecoder), Arc::new(FlatFieldDecoder))
    }

    fn request_for(dir: &Path) -> LoadRequest {
        LoadRequest {
            mesh_path: dir.join("sub-control.msh"),
            tissue_dir: dir.to_path_buf(),
        }
    }

    /// Drain events until a terminal one for `instance` arrives.
    async fn terminal_event(pipeline: &mut LoadPipeline, instance: u64) -> PipelineEvent {
        loop {
            let event = pipeline.next_event().await.expect("channel closed");
            let terminal = match &event {
                PipelineEvent::Ready(result) => result.instance == instance,
                PipelineEvent::Superseded { instance: i }
                | PipelineEvent::Failed { instance: i, .. } => *i == instance,
                PipelineEvent::StateChanged { .. } => false,
            };
            if terminal {
                return event;
            }
        }
    }

    #[tokio::test]
    async fn test_successful_load_walks_states_and_publishes() {
        let dir = scratch_dir("success");
        write_subject(&dir);

        let mut pipeline = pipeline();
        let instance = pipeline.request_load(request_for(&dir));

        let mut states = Vec::new();
        let result = loop {
            match pipeline.next_event().await.expect("channel closed") {
                PipelineEvent::StateChanged { state, .. } => states.push(state),
                PipelineEvent::Ready(result) => break result,
                other => panic!("unexpected event: {other:?}"),
            }
        };

        assert_eq!(states, vec![LoadState::MeshLoading, LoadState::OverlayMerging]);
        assert_eq!(result.instance, instance);
        assert_eq!(result.grid.point_count(), 6);
        assert_eq!(result.grid.scalars[4..], [0.4, 0.8]);
        assert_eq!(result.color.entries().len(), 256);
        assert!(result.statistics[&Tissue::GrayMatter].is_defined());
        assert!(!result.statistics[&Tissue::Bone].is_defined());
    }

    #[tokio::test]
    async fn test_missing_mesh_fails() {
        let dir = scratch_dir("missing-mesh");

        let mut pipeline = pipeline();
        let instance = pipeline.request_load(request_for(&dir));

        match terminal_event(&mut pipeline, instance).await {
            PipelineEvent::Failed { error, .. } => {
                assert!(matches!(error, PipelineError::MeshDecode(_)));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_overlay_data_fails() {
        let dir = scratch_dir("no-overlay");
        write_subject(&dir);
        fs::remove_file(dir.join("e_gray_matter.npy")).unwrap();

        let mut pipeline = pipeline();
        let instance = pipeline.request_load(request_for(&dir));

        match terminal_event(&mut pipeline, instance).await {
            PipelineEvent::Failed { error, .. } => {
                assert!(matches!(error, PipelineError::Overlay(OverlayError::NoOverlayData { .. })));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stale_instance_is_superseded() {
        let dir = scratch_dir("superseded");
        write_subject(&dir);

        let mut pipeline = pipeline();
        // Both requests are issued before the runtime polls either worker,
        // so the first worker reaches its publish step after the second
        // request became the latest.
        let first = pipeline.request_load(request_for(&dir));
        let second = pipeline.request_load(request_for(&dir));

        match terminal_event(&mut pipeline, first).await {
            PipelineEvent::Superseded { instance } => assert_eq!(instance, first),
            other => panic!("expected superseded, got {other:?}"),
        }
        match terminal_event(&mut pipeline, second).await {
            PipelineEvent::Ready(result) => assert_eq!(result.instance, second),
            other => panic!("expected ready, got {other:?}"),
        }
        assert_eq!(pipeline.latest_instance(), second);
    }
}
