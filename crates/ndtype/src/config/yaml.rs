// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML runtime configuration loader.
//!
//! # Example YAML
//!
//! ```yaml
//! # ndtype.yaml
//! default_errmode: inexact
//! type_cache_capacity: 1024
//! ```

use super::{EvalContext, RuntimeConfig};
use crate::error::{Error, Result};
use crate::kernels::AssignErrorMode;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// YAML configuration loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfigDocument {
    /// none, overflow, fractional, inexact or default
    pub default_errmode: Option<String>,

    /// Capacity of the global type-string cache
    pub type_cache_capacity: Option<usize>,
}

impl YamlLoader {
    /// Load a configuration document from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<YamlConfigDocument> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse YAML content.
    pub fn parse_yaml(content: &str) -> Result<YamlConfigDocument> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Evaluation context described by the document.
    pub fn eval_context(doc: &YamlConfigDocument) -> Result<EvalContext> {
        let mut ectx = EvalContext::default();
        if let Some(ref name) = doc.default_errmode {
            ectx.default_errmode = AssignErrorMode::from_name(&name.to_lowercase())
                .ok_or_else(|| Error::Config(format!("Invalid default_errmode: {}", name)))?;
        }
        Ok(ectx)
    }

    /// Validates the whole document, then applies it to `config`.
    pub fn apply(doc: &YamlConfigDocument, config: &RuntimeConfig) -> Result<()> {
        let ectx = Self::eval_context(doc)?;
        if doc.type_cache_capacity == Some(0) {
            return Err(Error::Config("type_cache_capacity must be > 0".into()));
        }
        config.set_eval_context(ectx);
        if let Some(capacity) = doc.type_cache_capacity {
            config.set_type_cache_capacity(capacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_apply() {
        let doc = YamlLoader::parse_yaml("default_errmode: INEXACT\ntype_cache_capacity: 32\n")
            .expect("parse");
        let config = RuntimeConfig::new();
        YamlLoader::apply(&doc, &config).expect("apply");
        assert_eq!(config.eval_context().default_errmode, AssignErrorMode::Inexact);
        assert_eq!(config.type_cache_capacity(), 32);
    }

    #[test]
    fn test_empty_document_is_default() {
        let doc = YamlLoader::parse_yaml("{}").expect("parse");
        assert_eq!(
            YamlLoader::eval_context(&doc).expect("context"),
            EvalContext::default()
        );
    }

    #[test]
    fn test_invalid_errmode_leaves_config_untouched() {
        let doc = YamlLoader::parse_yaml("default_errmode: strict\n").expect("parse");
        let config = RuntimeConfig::new();
        assert!(matches!(
            YamlLoader::apply(&doc, &config),
            Err(Error::Config(_))
        ));
        assert_eq!(config.eval_context(), EvalContext::default());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(YamlLoader::parse_yaml("default_errmode: [").is_err());
    }
}
