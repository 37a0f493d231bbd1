//! Build Configuration
//!
//! Every field has a serde default, so a partial JSON file is a valid config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid layout setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecConfig {
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl SpecConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.layout.check()?;
        Ok(config)
    }

    /// Loads `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Physical page setup applied to every module page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    #[serde(default = "default_left_column_width")]
    pub left_column_width: f64,
    #[serde(default = "default_right_column_width")]
    pub right_column_width: f64,
    #[serde(default = "default_row_height")]
    pub row_height: f64,
    #[serde(default = "default_section_row_height")]
    pub section_row_height: f64,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_section_font_size")]
    pub section_font_size: f64,
    #[serde(default = "default_true")]
    pub word_wrap: bool,
    /// 1-based.
    #[serde(default = "default_first")]
    pub first_row: u32,
    /// 1-based.
    #[serde(default = "default_first")]
    pub first_column: u32,
}

fn default_true() -> bool { true }
fn default_left_column_width() -> f64 { 31.0 }
fn default_right_column_width() -> f64 { 100.0 }
fn default_row_height() -> f64 { 14.25 }
fn default_section_row_height() -> f64 { 27.75 }
fn default_font() -> String { "Lucida Sans".to_string() }
fn default_font_size() -> f64 { 10.0 }
fn default_section_font_size() -> f64 { 12.0 }
fn default_first() -> u32 { 1 }

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left_column_width: default_left_column_width(),
            right_column_width: default_right_column_width(),
            row_height: default_row_height(),
            section_row_height: default_section_row_height(),
            font: default_font(),
            font_size: default_font_size(),
            section_font_size: default_section_font_size(),
            word_wrap: true,
            first_row: default_first(),
            first_column: default_first(),
        }
    }
}

impl LayoutConfig {
    fn check(&self) -> Result<(), ConfigError> {
        if self.first_row == 0 || self.first_column == 0 {
            return Err(ConfigError::Invalid(
                "firstRow and firstColumn are 1-based".to_string(),
            ));
        }
        let sizes = [
            self.left_column_width,
            self.right_column_width,
            self.row_height,
            self.section_row_height,
            self.font_size,
            self.section_font_size,
        ];
        if sizes.iter().any(|size| !size.is_finite() || *size <= 0.0) {
            return Err(ConfigError::Invalid(
                "widths, heights and font sizes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    #[serde(default)]
    pub failure_mode: FailureMode,
    #[serde(default)]
    pub rules: AuditRules,
}

/// What a build does with audit errors.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Errors stop the build.
    Block,
    /// Errors are reported and logged; the build continues.
    #[default]
    Warn,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRules {
    #[serde(default = "default_true")]
    pub reserved_codes: bool,
    #[serde(default = "default_true")]
    pub flag_partitions: bool,
    #[serde(default = "default_true")]
    pub prog_family: bool,
    #[serde(default = "default_true")]
    pub page_titles: bool,
    #[serde(default = "default_true")]
    pub derived_drift: bool,
}

impl Default for AuditRules {
    fn default() -> Self {
        Self {
            reserved_codes: true,
            flag_partitions: true,
            prog_family: true,
            page_titles: true,
            derived_drift: true,
        }
    }
}
