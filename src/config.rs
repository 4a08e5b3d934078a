//! Site configuration.
//!
//! Configuration lives in the `[config]` section of `site.toml` at the
//! content root, the same file that records what has been published (see
//! [`crate::state`]). Everything is optional; stock defaults fill the gaps.
//!
//! ## Configuration Options
//!
//! ```toml
//! [config]
//! title = ""                       # Site title, injected into the scaffold's index.html
//! utc_offset = "-05:00"            # Reference timezone for every stored timestamp
//! menu_limit = 5                   # Entries in etc/menu_data.json
//! output_extension = "html"        # Extension of rendered pages
//! template = "templates/main.html" # Page template (built-in when omitted)
//! callout_template = "templates/callout.html"
//! scaffold = "templates/output"    # Static assets copied into the output root
//! ```
//!
//! Paths are relative to the content root. Unknown keys are rejected to catch
//! typos early.
//!
//! ## Round-Tripping
//!
//! The state store keeps the file's `[config]` table, comments included,
//! alongside the resolved [`SiteConfig`] and never rewrites it. Defaults are
//! never materialised into the user's file.

use crate::dates::{self, DateError};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML error in [config]: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Config error: {0}")]
    Date(#[from] DateError),
}

/// Site configuration resolved from the `[config]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title. Empty means "leave the scaffold's title alone".
    pub title: String,
    /// Reference timezone as a fixed UTC offset.
    pub utc_offset: String,
    /// Maximum number of entries in the menu projection.
    pub menu_limit: usize,
    /// Extension (without the dot) of rendered pages.
    pub output_extension: String,
    /// Page template that prints `{{ .content }}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    /// Template for callout blocks that prints `{{ .content }}`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callout_template: Option<PathBuf>,
    /// Directory whose contents are copied into the output root.
    pub scaffold: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            utc_offset: "-05:00".to_string(),
            menu_limit: 5,
            output_extension: "html".to_string(),
            template: None,
            callout_template: None,
            scaffold: PathBuf::from("templates/output"),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        dates::parse_offset(&self.utc_offset)?;
        if self.output_extension.is_empty() || self.output_extension.contains('.') {
            return Err(ConfigError::Validation(
                "output_extension must be a bare extension like \"html\"".into(),
            ));
        }
        if self.output_extension == "md" {
            return Err(ConfigError::Validation(
                "output_extension must differ from the source extension".into(),
            ));
        }
        Ok(())
    }

    /// The reference timezone. Only call on a validated config.
    pub fn reference_zone(&self) -> Result<FixedOffset, ConfigError> {
        Ok(dates::parse_offset(&self.utc_offset)?)
    }

    /// Resolve a `[config]` table: stock defaults overlaid with the user's
    /// values, then validated.
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let merged = merge_toml(stock_defaults_value(), toml::Value::Table(table.clone()));
        let config: SiteConfig = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Config merging
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Returns a fully-commented stock `site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Inkpress site file
# ==================
# This file is both the site configuration and the publish record.
# The [config] section is yours to edit; every setting is optional and the
# values below are the defaults. The [articles] tables are written by
# `inkpress build` and list every document ever published, oldest first.
# Editing a record's `published` value by hand is fine; deleting a record
# makes the document count as new on the next build.

version = 1

[config]
# Site title, substituted for {{ .site_title }} in the scaffold's index.html.
title = ""

# Reference timezone for all stored timestamps, as a fixed UTC offset.
utc_offset = "-05:00"

# Number of most recent documents listed in etc/menu_data.json.
menu_limit = 5

# Extension of rendered pages.
output_extension = "html"

# Page template (Go template syntax), relative to the content root. Must
# print {{ .content }}; may print {{ .title }} and {{ .site_title }}.
# Built-in when omitted.
# template = "templates/main.html"

# Template used for ```callout and ```warning fenced blocks.
# Must print {{ .content }}; may print {{ .title }}.
# callout_template = "templates/callout.html"

# Directory copied into the output root on every publishing build. When it
# does not exist, the built-in etc/menu.js is installed instead.
scaffold = "templates/output"
"##
}
