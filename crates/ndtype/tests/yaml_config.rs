// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![cfg(feature = "config-loaders")]
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Loading runtime configuration from YAML files.

use ndtype::config::yaml::YamlLoader;
use ndtype::config::{RuntimeConfig, DEFAULT_TYPE_CACHE_CAPACITY};
use ndtype::kernels::{make_assignment_kernel, AssignErrorMode, KernelBuilder, KernelRequest};
use ndtype::{make_dtype, Error, Metadata};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

#[test]
fn test_load_and_apply() {
    let file = write_config("default_errmode: inexact\ntype_cache_capacity: 32\n");
    let doc = YamlLoader::load_from_file(file.path()).expect("load");
    let config = RuntimeConfig::new();
    YamlLoader::apply(&doc, &config).expect("apply");

    assert_eq!(config.eval_context().default_errmode, AssignErrorMode::Inexact);
    assert_eq!(config.type_cache_capacity(), 32);
}

#[test]
fn test_loaded_context_drives_default_errmode() {
    let file = write_config("default_errmode: overflow\n");
    let doc = YamlLoader::load_from_file(file.path()).expect("load");
    let ectx = YamlLoader::eval_context(&doc).expect("context");

    // Under `overflow`, 2.5 -> int32 truncates instead of failing.
    let mut builder = KernelBuilder::new();
    make_assignment_kernel(
        &mut builder,
        0,
        &make_dtype::<i32>(),
        &Metadata::None,
        &make_dtype::<f64>(),
        &Metadata::None,
        KernelRequest::Single,
        AssignErrorMode::Default,
        &ectx,
    )
    .expect("kernel");
    let mut out = [0u8; 4];
    builder
        .get(0)
        .expect("root")
        .call_single(&mut out, &[&2.5f64.to_ne_bytes()])
        .expect("call");
    assert_eq!(i32::from_ne_bytes(out), 2);
}

#[test]
fn test_empty_document_keeps_defaults() {
    let file = write_config("# nothing configured\n{}\n");
    let doc = YamlLoader::load_from_file(file.path()).expect("load");
    let config = RuntimeConfig::new();
    YamlLoader::apply(&doc, &config).expect("apply");
    assert_eq!(config.eval_context().default_errmode, AssignErrorMode::Fractional);
    assert_eq!(config.type_cache_capacity(), DEFAULT_TYPE_CACHE_CAPACITY);
}

#[test]
fn test_invalid_documents_are_rejected() {
    let config = RuntimeConfig::new();

    let file = write_config("default_errmode: sometimes\n");
    let doc = YamlLoader::load_from_file(file.path()).expect("load");
    assert!(matches!(YamlLoader::apply(&doc, &config), Err(Error::Config(_))));

    let file = write_config("type_cache_capacity: 0\n");
    let doc = YamlLoader::load_from_file(file.path()).expect("load");
    assert!(matches!(YamlLoader::apply(&doc, &config), Err(Error::Config(_))));
    assert_eq!(config.type_cache_capacity(), DEFAULT_TYPE_CACHE_CAPACITY);

    let file = write_config("default_errmode: [unclosed\n");
    assert!(matches!(
        YamlLoader::load_from_file(file.path()),
        Err(Error::Config(_))
    ));

    assert!(matches!(
        YamlLoader::load_from_file("/nonexistent/ndtype.yaml"),
        Err(Error::Io(_))
    ));
}
