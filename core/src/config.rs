use crate::error::{CoreError, CoreResult};
use crate::split::slider::DEFAULT_SLIDER_DIVISIONS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    pub payer_a_label: String,
    pub payer_b_label: String,
    pub slider_divisions: u32,
    pub display_name_max_chars: usize,
    pub analysis_timeout_ms: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            payer_a_label: "A".to_string(),
            payer_b_label: "B".to_string(),
            slider_divisions: DEFAULT_SLIDER_DIVISIONS,
            display_name_max_chars: 24,
            analysis_timeout_ms: 30_000,
        }
    }
}

impl SplitConfig {
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let bytes = fs::read(path.as_ref())?;
        let cfg: SplitConfig = serde_json::from_slice(&bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.payer_a_label.trim().is_empty() || self.payer_b_label.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "payer labels must not be empty".to_string(),
            ));
        }
        if self.payer_a_label == self.payer_b_label {
            return Err(CoreError::InvalidInput(format!(
                "payer labels must differ, both are {:?}",
                self.payer_a_label
            )));
        }
        if self.slider_divisions == 0 {
            return Err(CoreError::InvalidInput(
                "slider_divisions must be at least 1".to_string(),
            ));
        }
        if self.display_name_max_chars == 0 {
            return Err(CoreError::InvalidInput(
                "display_name_max_chars must be at least 1".to_string(),
            ));
        }
        if self.analysis_timeout_ms == 0 {
            return Err(CoreError::InvalidInput(
                "analysis_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
