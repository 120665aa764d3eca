//! Session configuration supplied by the host.

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, Result};

fn default_ppi() -> f64 {
    96.0
}

fn default_auto_submit() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Prefix joined with the engine's image file name to build the preview URL.
    #[serde(default)]
    pub image_base_url: String,
    #[serde(default = "default_ppi")]
    pub default_ppi: f64,
    /// Submit a render request after every edit. Hosts that coalesce drag edits turn this off
    /// and call `submit` themselves.
    #[serde(default = "default_auto_submit")]
    pub auto_submit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            image_base_url: String::new(),
            default_ppi: default_ppi(),
            auto_submit: default_auto_submit(),
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        check_ppi(config.default_ppi)?;
        Ok(config)
    }

    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = url.into();
        self
    }

    pub fn with_auto_submit(mut self, auto_submit: bool) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    /// URL of an engine image file, or the bare file name when no base is configured.
    pub fn image_url(&self, file: &str) -> String {
        if self.image_base_url.is_empty() {
            return file.to_string();
        }
        format!(
            "{}/{}",
            self.image_base_url.trim_end_matches('/'),
            file.trim_start_matches('/')
        )
    }
}

/// Rejects resolutions the render engine cannot use, NaN included.
pub fn check_ppi(ppi: f64) -> Result<()> {
    if ppi.is_finite() && ppi > 0.0 {
        Ok(())
    } else {
        Err(EditorError::InvalidPpi(ppi))
    }
}
