use serde::Deserialize;

use crate::error::ReconError;
use crate::model::{KEY_COLUMN, METRIC_INTERACTIVE, METRIC_LAST_LOGIN, METRIC_SUBSCRIPTION};

/// Default key-batch size for the join/diff step.
pub const DEFAULT_BATCH_SIZE: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Source schemas
// ---------------------------------------------------------------------------

/// The five declared source roles. Each carries the column set a source of
/// that role is expected to supply; absence of an expected column is a
/// logged warning at load time, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    PreBalances,
    PreActivity,
    PostInteractive,
    PostSubscription,
    PostActivity,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::PreBalances => "pre_balances",
            Self::PreActivity => "pre_activity",
            Self::PostInteractive => "post_interactive",
            Self::PostSubscription => "post_subscription",
            Self::PostActivity => "post_activity",
        }
    }

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::PreBalances => &[KEY_COLUMN, METRIC_INTERACTIVE, METRIC_SUBSCRIPTION],
            Self::PreActivity => &[KEY_COLUMN, METRIC_LAST_LOGIN],
            Self::PostInteractive => &[KEY_COLUMN, METRIC_INTERACTIVE],
            Self::PostSubscription => &[KEY_COLUMN, METRIC_SUBSCRIPTION],
            Self::PostActivity => &[KEY_COLUMN, METRIC_LAST_LOGIN],
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Run config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub preparer: String,
    pub reviewer: String,
    pub sources: SourcesConfig,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub output: OutputConfig,
}

/// File paths per source role, relative to the config file's directory.
/// Only the pre-balances snapshot is mandatory.
#[derive(Debug, Default, Deserialize)]
pub struct SourcesConfig {
    pub pre_balances: Option<String>,
    #[serde(default)]
    pub pre_activity: Option<String>,
    #[serde(default)]
    pub post_interactive: Option<String>,
    #[serde(default)]
    pub post_subscription: Option<String>,
    #[serde(default)]
    pub post_activity: Option<String>,
}

impl SourcesConfig {
    pub fn path(&self, kind: SourceKind) -> Option<&str> {
        match kind {
            SourceKind::PreBalances => self.pre_balances.as_deref(),
            SourceKind::PreActivity => self.pre_activity.as_deref(),
            SourceKind::PostInteractive => self.post_interactive.as_deref(),
            SourceKind::PostSubscription => self.post_subscription.as_deref(),
            SourceKind::PostActivity => self.post_activity.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Exception report path. When absent the CLI derives
    /// `exceptions_{preparer}_{timestamp}.csv`.
    #[serde(default)]
    pub exceptions: Option<String>,
    /// Diagnostics log path.
    #[serde(default = "default_log_path")]
    pub log: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { exceptions: None, log: default_log_path() }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_log_path() -> String {
    "logs/internal_errors.txt".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        match self.sources.pre_balances.as_deref() {
            None | Some("") => {
                return Err(ReconError::ConfigValidation(
                    "sources.pre_balances is required".into(),
                ));
            }
            Some(_) => {}
        }

        if self.preparer.trim().is_empty() || self.reviewer.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "preparer and reviewer names are required".into(),
            ));
        }

        if self.batch_size == 0 {
            return Err(ReconError::ConfigValidation("batch_size must be non-zero".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
