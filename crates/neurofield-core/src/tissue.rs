//! Anatomical tissue taxonomy.
//!
//! The five head-model layers for which field samples may exist. The set is
//! closed: sample-file naming, display labels, and reporting order all derive
//! from this enum, matched exhaustively.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One of the five anatomical layers of the head model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tissue {
    /// Skin layer
    Scalp,
    /// Skull
    Bone,
    /// Cerebrospinal fluid
    Csf,
    /// Cortical gray matter
    GrayMatter,
    /// Subcortical white matter
    WhiteMatter,
}

impl Tissue {
    /// All tissues, in canonical reporting order.
    pub const ALL: [Tissue; 5] = [
        Tissue::Scalp,
        Tissue::Bone,
        Tissue::Csf,
        Tissue::GrayMatter,
        Tissue::WhiteMatter,
    ];

    /// Human-readable name, as shown in reports.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Tissue::Scalp => "Scalp",
            Tissue::Bone => "Bone",
            Tissue::Csf => "CSF",
            Tissue::GrayMatter => "Gray Matter",
            Tissue::WhiteMatter => "White Matter",
        }
    }

    /// File-name slug used by the upstream solver's exports.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Tissue::Scalp => "scalp",
            Tissue::Bone => "bone",
            Tissue::Csf => "csf",
            Tissue::GrayMatter => "gray_matter",
            Tissue::WhiteMatter => "white_matter",
        }
    }

    /// Name of this tissue's sample file within a result directory.
    #[must_use]
    pub fn sample_filename(self) -> String {
        format!("e_{}.npy", self.slug())
    }

    /// Look a tissue up by its file-name slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Tissue> {
        Tissue::ALL.into_iter().find(|t| t.slug() == slug)
    }
}

impl fmt::Display for Tissue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
