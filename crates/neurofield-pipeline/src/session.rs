//! Stimulation session parameters.
//!
//! The user's parameter selection determines which precomputed result
//! directory feeds the pipeline. Every choice is a closed enum matched
//! exhaustively; the directory names mirror the upstream solver's output
//! layout and must not drift from it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the subject head mesh within a subject root.
pub const SUBJECT_MESH_FILENAME: &str = "sub-control.msh";

/// Failure to parse a session parameter from its CLI token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {token}")]
pub struct ParseParamError {
    /// Which parameter failed to parse
    kind: &'static str,
    /// The offending token
    token: String,
}

impl ParseParamError {
    fn new(kind: &'static str, token: &str) -> Self {
        Self {
            kind,
            token: token.to_string(),
        }
    }
}

/// TMS coil model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoilModel {
    /// Deymed 70 mm butterfly
    Bf70,
    /// Deymed 50 mm butterfly
    Bf50,
    /// MagVenture C-B70
    Cb70,
    /// MagVenture C-B60
    Cb60,
}

impl CoilModel {
    /// Result-directory segment for this coil.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            CoilModel::Bf70 => "Deymed_70BF",
            CoilModel::Bf50 => "Deymed_50BF",
            CoilModel::Cb70 => "MagVenture_C-B70",
            CoilModel::Cb60 => "MagVenture_C-B60",
        }
    }
}

impl FromStr for CoilModel {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bf70" => Ok(CoilModel::Bf70),
            "bf50" => Ok(CoilModel::Bf50),
            "cb70" => Ok(CoilModel::Cb70),
            "cb60" => Ok(CoilModel::Cb60),
            other => Err(ParseParamError::new("coil model", other)),
        }
    }
}

/// TMS stimulation target (10-20 electrode position).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum StimTarget {
    C3,
    C4,
    F3,
    F4,
}

impl StimTarget {
    /// Result-directory segment for this target.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            StimTarget::C3 => "C3",
            StimTarget::C4 => "C4",
            StimTarget::F3 => "F3",
            StimTarget::F4 => "F4",
        }
    }
}

impl FromStr for StimTarget {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C3" | "c3" => Ok(StimTarget::C3),
            "C4" | "c4" => Ok(StimTarget::C4),
            "F3" | "f3" => Ok(StimTarget::F3),
            "F4" | "f4" => Ok(StimTarget::F4),
            other => Err(ParseParamError::new("stimulation target", other)),
        }
    }
}

/// tES electrode montage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum TesMontage {
    C4Af3,
    F3F4,
    F3Fp2,
    F4Fp1,
    P3P4,
}

impl TesMontage {
    /// Result-directory segment for this montage.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            TesMontage::C4Af3 => "tDCS-C4-AF3",
            TesMontage::F3F4 => "tDCS-F3-F4",
            TesMontage::F3Fp2 => "tDCS-F3-Fp2",
            TesMontage::F4Fp1 => "tDCS-F4-Fp1",
            TesMontage::P3P4 => "tDCS-P3-P4",
        }
    }
}

impl FromStr for TesMontage {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C4-AF3" | "c4-af3" => Ok(TesMontage::C4Af3),
            "F3-F4" | "f3-f4" => Ok(TesMontage::F3F4),
            "F3-Fp2" | "f3-fp2" => Ok(TesMontage::F3Fp2),
            "F4-Fp1" | "f4-fp1" => Ok(TesMontage::F4Fp1),
            "P3-P4" | "p3-p4" => Ok(TesMontage::P3P4),
            other => Err(ParseParamError::new("electrode montage", other)),
        }
    }
}

/// tES electrode thickness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum ElectrodeThickness {
    Mm4,
    Mm5,
    Mm6,
}

impl ElectrodeThickness {
    /// Result-directory segment for this thickness.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            ElectrodeThickness::Mm4 => "thickness-4",
            ElectrodeThickness::Mm5 => "thickness-5",
            ElectrodeThickness::Mm6 => "thickness-6",
        }
    }
}

impl FromStr for ElectrodeThickness {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4mm" => Ok(ElectrodeThickness::Mm4),
            "5mm" => Ok(ElectrodeThickness::Mm5),
            "6mm" => Ok(ElectrodeThickness::Mm6),
            other => Err(ParseParamError::new("electrode thickness", other)),
        }
    }
}

/// Stimulation intensity (coil dI/dt). All intensities currently resolve to
/// the same export directory; the distinction is kept because the solver's
/// layout reserves it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum StimIntensity {
    DiDt1e6,
    DiDt5e6,
    DiDt10e6,
}

impl StimIntensity {
    /// Result-directory segment for this intensity.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            StimIntensity::DiDt1e6 | StimIntensity::DiDt5e6 | StimIntensity::DiDt10e6 => {
                "npy_outputs"
            }
        }
    }

    /// Display label, as shown in selection UIs.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StimIntensity::DiDt1e6 => "1.00x1e6 A/s",
            StimIntensity::DiDt5e6 => "5.00x1e6 A/s",
            StimIntensity::DiDt10e6 => "10.00x1e6 A/s",
        }
    }
}

impl FromStr for StimIntensity {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1e6" => Ok(StimIntensity::DiDt1e6),
            "5e6" => Ok(StimIntensity::DiDt5e6),
            "10e6" => Ok(StimIntensity::DiDt10e6),
            other => Err(ParseParamError::new("stimulation intensity", other)),
        }
    }
}

/// One session's parameter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionParams {
    /// Transcranial magnetic stimulation
    Tms {
        /// Coil model
        coil: CoilModel,
        /// Stimulation target
        target: StimTarget,
        /// Coil dI/dt
        intensity: StimIntensity,
    },
    /// Transcranial electrical stimulation
    Tes {
        /// Electrode montage
        montage: TesMontage,
        /// Electrode thickness
        thickness: ElectrodeThickness,
        /// Stimulation intensity
        intensity: StimIntensity,
    },
}

impl SessionParams {
    /// Resolve the result directory for this selection under a subject
    /// root. TMS results nest coil/target/intensity; tES results nest
    /// montage/thickness/intensity.
    #[must_use]
    pub fn result_dir(&self, subject_root: &Path) -> PathBuf {
        match self {
            SessionParams::Tms {
                coil,
                target,
                intensity,
            } => subject_root
                .join(coil.dir_name())
                .join(target.dir_name())
                .join(intensity.dir_name()),
            SessionParams::Tes {
                montage,
                thickness,
                intensity,
            } => subject_root
                .join(montage.dir_name())
                .join(thickness.dir_name())
                .join(intensity.dir_name()),
        }
    }

    /// Path of the subject mesh under a subject root.
    #[must_use]
    pub fn mesh_path(subject_root: &Path) -> PathBuf {
        subject_root.join(SUBJECT_MESH_FILENAME)
    }
}

impl fmt::Display for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionParams::Tms {
                coil,
                target,
                intensity,
            } => write!(
                f,
                "TMS {} at {} ({})",
                coil.dir_name(),
                target.dir_name(),
                intensity.label()
            ),
            SessionParams::Tes {
                montage,
                thickness,
                intensity,
            } => write!(
                f,
                "tES {} {} ({})",
                montage.dir_name(),
                thickness.dir_name(),
                intensity.label()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tms_result_dir_layout() {
        let params = SessionParams::Tms {
            coil: CoilModel::Bf70,
            target: StimTarget::C3,
            intensity: StimIntensity::DiDt5e6,
        };
        let dir = params.result_dir(Path::new("/data/sub-01"));
        assert_eq!(
            dir,
            Path::new("/data/sub-01/Deymed_70BF/C3/npy_outputs")
        );
    }

    #[test]
    fn test_tes_result_dir_layout() {
        let params = SessionParams::Tes {
            montage: TesMontage::C4Af3,
            thickness: ElectrodeThickness::Mm4,
            intensity: StimIntensity::DiDt1e6,
        };
        let dir = params.result_dir(Path::new("/data/sub-01"));
        assert_eq!(
            dir,
            Path::new("/data/sub-01/tDCS-C4-AF3/thickness-4/npy_outputs")
        );
    }

    #[test]
    fn test_mesh_path() {
        assert_eq!(
            SessionParams::mesh_path(Path::new("/data/sub-01")),
            Path::new("/data/sub-01/sub-control.msh")
        );
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("cb70".parse::<CoilModel>(), Ok(CoilModel::Cb70));
        assert_eq!("F3".parse::<StimTarget>(), Ok(StimTarget::F3));
        assert_eq!("P3-P4".parse::<TesMontage>(), Ok(TesMontage::P3P4));
        assert_eq!("5mm".parse::<ElectrodeThickness>(), Ok(ElectrodeThickness::Mm5));
        assert_eq!("10e6".parse::<StimIntensity>(), Ok(StimIntensity::DiDt10e6));
        assert!("bf90".parse::<CoilModel>().is_err());
    }
}
