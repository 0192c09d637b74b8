//! Neurofield Pipeline - Decoding, merge, and load orchestration
//!
//! Host-side tier of the field-augmented mesh assembly pipeline:
//!
//! - [`decode`]: Decoder seams for mesh and field-sample files, plus the
//!   flat binary interchange decoders
//! - [`overlay`]: Overlay source selection (tissue precedence) and merge
//! - [`pipeline`]: The non-blocking load pipeline and its event stream
//! - [`session`]: Stimulation parameter selection → result directory
//! - [`report`]: Per-tissue statistics rendering and JSON export

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod decode;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod session;

pub use decode::{
    FieldSampleDecoder, FlatFieldDecoder, FlatMeshDecoder, MeshDecodeError, MeshDecoder,
    SampleDecodeError,
};
pub use overlay::{FieldOverlayMerger, OverlayError};
pub use pipeline::{LoadPipeline, LoadRequest, LoadResult, LoadState, PipelineError, PipelineEvent};
pub use report::FieldReport;
pub use session::{
    CoilModel, ElectrodeThickness, SessionParams, StimIntensity, StimTarget, TesMontage,
};
