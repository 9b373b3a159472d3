//! Stage - Checkpoint positions along the conveyor line

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TrackError;

/// Checkpoint along the conveyor line, in belt order.
///
/// `Scanner` is the barcode gate where a parcel identity enters the
/// system. `Cam0` is the local camera right after the scanner, `Cam1`
/// through `Cam3` are the downstream overhead cameras, and `EndOfLine`
/// is the virtual checkpoint past the last camera.
///
/// The derived `Ord` follows belt order, which is what queue and route
/// bookkeeping rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Scanner,
    Cam0,
    Cam1,
    Cam2,
    Cam3,
    #[serde(rename = "eol")]
    EndOfLine,
}

impl Stage {
    /// All stages in belt order.
    pub const ALL: [Stage; 6] = [
        Stage::Scanner,
        Stage::Cam0,
        Stage::Cam1,
        Stage::Cam2,
        Stage::Cam3,
        Stage::EndOfLine,
    ];

    /// The next checkpoint downstream, if any.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Scanner => Some(Stage::Cam0),
            Stage::Cam0 => Some(Stage::Cam1),
            Stage::Cam1 => Some(Stage::Cam2),
            Stage::Cam2 => Some(Stage::Cam3),
            Stage::Cam3 => Some(Stage::EndOfLine),
            Stage::EndOfLine => None,
        }
    }

    /// True for stages that carry a physical camera.
    pub fn is_camera(self) -> bool {
        !matches!(self, Stage::Scanner | Stage::EndOfLine)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Scanner => "scanner",
            Stage::Cam0 => "cam0",
            Stage::Cam1 => "cam1",
            Stage::Cam2 => "cam2",
            Stage::Cam3 => "cam3",
            Stage::EndOfLine => "eol",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scanner" => Ok(Stage::Scanner),
            "cam0" => Ok(Stage::Cam0),
            "cam1" => Ok(Stage::Cam1),
            "cam2" => Ok(Stage::Cam2),
            "cam3" => Ok(Stage::Cam3),
            "eol" => Ok(Stage::EndOfLine),
            other => Err(TrackError::config_validation(
                "stage",
                format!("unknown stage '{other}'"),
            )),
        }
    }
}
