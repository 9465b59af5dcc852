//! # Enforcer Configuration
//!
//! Per-callable switches, loadable from YAML or JSON. Missing fields take
//! their defaults, so an empty document is the default configuration.
//!
//! ```yaml
//! enabled: true
//! strict: false          # warn and continue instead of failing
//! clean_traceback: true  # also accepted as `cleanTraceback`
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnforcerConfig {
    /// Skip all validation when false.
    pub enabled: bool,
    /// Fail the call on a violation when true; emit a warning and proceed
    /// when false.
    pub strict: bool,
    /// Render only the caller's location in failure reports.
    #[serde(alias = "cleanTraceback")]
    pub clean_traceback: bool,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: true,
            clean_traceback: true,
        }
    }
}

impl EnforcerConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // An empty YAML document deserializes as unit, not as a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn clean_traceback(mut self, clean_traceback: bool) -> Self {
        self.clean_traceback = clean_traceback;
        self
    }
}
