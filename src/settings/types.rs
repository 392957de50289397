use serde::{Deserialize, Serialize};

use crate::camera::types::CaptureConfig;

/// Top-level settings file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewSettings {
    pub capture: CaptureConfig,
    /// Use the synthetic camera even when `DUMMY_CAMERA` is unset.
    pub dummy_camera: bool,
}
