//! Engine configuration
//!
//! Defines:
//! - Debounce and bridge timing
//! - Error surfacing policy
//! - Name inference for arrows whose label is not a registered macro
//! - Text reflow settings handed to the splicer

use crate::error::ConfigError;
use galaxy_scene::{ElementKind, TextLayout};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before a selection change triggers a rescan
    pub debounce_ms: u64,
    /// Limit for a single remote call, unbounded when absent
    pub bridge_timeout_secs: Option<u64>,
    /// Also write a failed invocation's message into its output text
    pub write_errors_to_output: bool,
    /// Rewrite `https://github.com/.../blob/...` to the raw content host
    pub github_raw_rewrite: bool,
    /// Fallback names for unregistered or empty labels
    pub inference: InferencePolicy,
    /// Reflow applied to rewritten text elements
    pub layout: TextLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            bridge_timeout_secs: None,
            write_errors_to_output: false,
            github_raw_rewrite: true,
            inference: InferencePolicy::default(),
            layout: TextLayout::default(),
        }
    }
}

impl EngineConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Set debounce interval
    #[inline]
    #[must_use]
    pub fn with_debounce_ms(mut self, millis: u64) -> Self {
        self.debounce_ms = millis;
        self
    }

    /// Bound every remote call
    #[inline]
    #[must_use]
    pub fn with_bridge_timeout_secs(mut self, secs: u64) -> Self {
        self.bridge_timeout_secs = Some(secs);
        self
    }

    /// Mirror invocation errors into output text
    #[inline]
    #[must_use]
    pub fn with_errors_to_output(mut self, enabled: bool) -> Self {
        self.write_errors_to_output = enabled;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_inference(mut self, inference: InferencePolicy) -> Self {
        self.inference = inference;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: TextLayout) -> Self {
        self.layout = layout;
        self
    }

    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[inline]
    #[must_use]
    pub fn bridge_timeout(&self) -> Option<Duration> {
        self.bridge_timeout_secs.map(Duration::from_secs)
    }
}

/// Macro names chosen when an arrow label is not itself a registered macro
///
/// Unregistered labels are treated as arguments: a path for the file and
/// directory macros, an instruction for the completion macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferencePolicy {
    /// Text output, `/`-prefixed label containing `.`
    pub file: String,
    /// Text output, `/`-prefixed label without `.`
    pub directory: String,
    /// Text output, any other label
    pub text: String,
    /// Rectangle output
    pub rectangle: String,
    /// Image output
    pub image: String,
    /// Empty label, any output
    pub unlabeled: String,
    /// Anchor arrows scanned with an empty selection
    pub anchor: String,
}

impl Default for InferencePolicy {
    fn default() -> Self {
        Self {
            file: "cat".to_string(),
            directory: "ls".to_string(),
            text: "complete".to_string(),
            rectangle: "ls".to_string(),
            image: "draw".to_string(),
            unlabeled: "prompt".to_string(),
            anchor: "jump".to_string(),
        }
    }
}

impl InferencePolicy {
    /// Macro for a non-empty, unregistered label
    ///
    /// `None` means the arrow is skipped.
    #[must_use]
    pub fn infer(&self, label: &str, output: Option<&ElementKind>) -> Option<&str> {
        match output? {
            ElementKind::Text if label.starts_with('/') && label.contains('.') => Some(&self.file),
            ElementKind::Text if label.starts_with('/') => Some(&self.directory),
            ElementKind::Text => Some(&self.text),
            ElementKind::Rectangle => Some(&self.rectangle),
            ElementKind::Image => Some(&self.image),
            _ => None,
        }
    }
}
