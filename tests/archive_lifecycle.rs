//! Integration tests for the archive lifecycle: staging, ingestion,
//! processing and packaging through the public API.
//!
//! Packaging shells out to the system `tar`, which must be on PATH.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use flate2::read::GzDecoder;
use serde_json::{json, Value};
use tempfile::TempDir;

use insights_archive::archive::{ArchiveBuilder, ArchiveOptions, BuilderState, Compressor};
use insights_archive::artifacts::Artifact;
use insights_archive::config::CollectionPlan;
use insights_archive::constants::{COMMAND_DIR_NAME, PROCESSOR_OUTPUT_FILE};
use insights_archive::processors::ProcessorRegistry;

const HOST: &str = "testhost";

fn options(temp_base: &Path, compressor: Compressor) -> ArchiveOptions {
    ArchiveOptions {
        compressor,
        target_name: Some(HOST.to_string()),
        temp_base: temp_base.to_path_buf(),
    }
}

/// Regular-file entries of a tar stream, keyed by path without the leading `./`.
fn read_entries<R: Read>(reader: R) -> Result<BTreeMap<String, String>> {
    let mut archive = tar::Archive::new(reader);
    let mut files = BTreeMap::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.to_string_lossy().trim_start_matches("./").to_string();
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        files.insert(path, content);
    }

    Ok(files)
}

fn read_tar(path: &Path) -> Result<BTreeMap<String, String>> {
    read_entries(File::open(path)?)
}

fn read_tar_gz(path: &Path) -> Result<BTreeMap<String, String>> {
    read_entries(GzDecoder::new(File::open(path)?))
}

#[test]
fn test_metadata_round_trip_uncompressed() -> Result<()> {
    let temp_base = TempDir::new()?;
    let mut builder = ArchiveBuilder::new(
        options(temp_base.path(), Compressor::None),
        Arc::new(ProcessorRegistry::new()),
    )?;

    builder.add_metadata(r#"{"k":"v"}"#, "meta.json")?;
    let archive = builder.package(false)?;

    let file_name = archive.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(file_name.starts_with("insights-testhost-"));
    assert!(file_name.ends_with(".tar"));
    assert_eq!(archive.size, fs::metadata(&archive.path)?.len());
    assert!(archive.sha256.is_some());

    let entries = read_tar(&archive.path)?;
    assert_eq!(entries["meta.json"], r#"{"k":"v"}"#);

    let output: Value = serde_json::from_str(&entries[PROCESSOR_OUTPUT_FILE])?;
    assert_eq!(output, json!({ HOST: {} }));

    // Only the tar file remains in the root
    assert!(!builder.staging().archive_dir().exists());
    let remaining: Vec<_> = fs::read_dir(builder.staging().root())?.collect();
    assert_eq!(remaining.len(), 1);

    builder.cleanup_root();
    assert!(!archive.path.exists());
    Ok(())
}

#[test]
#[cfg(unix)]
fn test_gzip_archive_with_files_commands_and_processors() -> Result<()> {
    let temp_base = TempDir::new()?;
    let source = TempDir::new()?;
    let data = source.path().join("app.conf");
    fs::write(&data, "name=app\nmode=prod\n")?;
    let nested = source.path().join("logs");
    fs::create_dir_all(nested.join("old"))?;
    fs::write(nested.join("current.log"), "line one\n")?;
    fs::write(nested.join("old").join("previous.log"), "line zero\n")?;

    let mut registry = ProcessorRegistry::new();
    registry.register_fn("echo", "echo_words", |ctx| {
        let words: usize = ctx.content.iter().map(|l| l.split_whitespace().count()).sum();
        Ok(Some(json!(words)))
    });

    let mut builder = ArchiveBuilder::new(options(temp_base.path(), Compressor::Gzip), Arc::new(registry))?;

    let data_str = data.to_string_lossy().to_string();
    assert_eq!(builder.copy_file(&data_str).copied, vec![data.clone()]);
    let report = builder.copy_directories(&[&nested]);
    assert_eq!(report.copied.len(), 2);
    assert!(builder.add_artifact(&Artifact::command("echo hello world"), Some("echo")).is_some());

    let archive = builder.package(false)?;
    assert!(archive.path.to_string_lossy().ends_with(".tar.gz"));

    let entries = read_tar_gz(&archive.path)?;
    let rel = |p: &Path| p.to_string_lossy().trim_start_matches('/').to_string();

    assert_eq!(entries[&rel(&data)], "name=app\nmode=prod\n");
    assert_eq!(entries[&rel(&nested.join("old").join("previous.log"))], "line zero\n");
    assert_eq!(entries[&format!("{}/echo_hello_world", COMMAND_DIR_NAME)], "hello world\n");

    let output: Value = serde_json::from_str(&entries[PROCESSOR_OUTPUT_FILE])?;
    assert_eq!(output, json!({ HOST: { "echo_words": [2] } }));
    Ok(())
}

#[test]
fn test_full_archive_includes_archive_directory() -> Result<()> {
    let temp_base = TempDir::new()?;
    let mut builder = ArchiveBuilder::new(
        options(temp_base.path(), Compressor::None),
        Arc::new(ProcessorRegistry::new()),
    )?;
    let name = builder.archive_name().to_string();

    builder.add_metadata("1", "branch_info")?;
    let archive = builder.package(true)?;

    let entries = read_tar(&archive.path)?;
    assert_eq!(entries[&format!("{}/branch_info", name)], "1");
    assert!(entries.contains_key(&format!("{}/{}", name, PROCESSOR_OUTPUT_FILE)));
    Ok(())
}

#[test]
#[cfg(unix)]
fn test_failing_processors_do_not_stop_packaging() -> Result<()> {
    let temp_base = TempDir::new()?;
    let mut registry = ProcessorRegistry::new();
    registry
        .register_fn("echo", "panics", |_| panic!("processor bug"))
        .register_fn("echo", "errors", |_| bail!("cannot parse"))
        .register_fn("echo", "empty", |_| Ok(Some(json!({}))))
        .register_fn("echo", "lines", |ctx| Ok(Some(json!(ctx.content.len()))));

    let mut builder = ArchiveBuilder::new(options(temp_base.path(), Compressor::None), Arc::new(registry))?;
    builder.add_artifact(&Artifact::command("echo one"), Some("echo"));
    builder.add_artifact(&Artifact::command("echo two"), Some("echo"));

    let archive = builder.package(false)?;
    let entries = read_tar(&archive.path)?;
    let output: Value = serde_json::from_str(&entries[PROCESSOR_OUTPUT_FILE])?;

    assert_eq!(output, json!({ HOST: { "lines": [1, 1] } }));
    Ok(())
}

#[test]
fn test_concurrent_builders_get_distinct_roots() -> Result<()> {
    let temp_base = TempDir::new()?;
    let registry = Arc::new(ProcessorRegistry::new());

    let mut first = ArchiveBuilder::new(options(temp_base.path(), Compressor::None), Arc::clone(&registry))?;
    let mut second = ArchiveBuilder::new(options(temp_base.path(), Compressor::None), Arc::clone(&registry))?;
    assert_ne!(first.staging().root(), second.staging().root());

    first.add_metadata("first", "who")?;
    second.add_metadata("second", "who")?;
    let first_archive = first.package(false)?;
    let second_archive = second.package(false)?;

    assert_eq!(read_tar(&first_archive.path)?["who"], "first");
    assert_eq!(read_tar(&second_archive.path)?["who"], "second");
    Ok(())
}

#[test]
fn test_lifecycle_after_packaging() -> Result<()> {
    let temp_base = TempDir::new()?;
    let mut builder = ArchiveBuilder::new(
        options(temp_base.path(), Compressor::None),
        Arc::new(ProcessorRegistry::new()),
    )?;
    let root = builder.staging().root().to_path_buf();

    let archive = builder.package(false)?;
    assert_eq!(builder.state(), BuilderState::Packaged);
    assert!(builder.package(false).is_err());
    assert!(builder.add_metadata("late", "late.txt").is_err());
    assert!(builder.add_artifact(&Artifact::command("echo late"), None).is_none());

    // Dropping a packaged builder keeps the archive for the caller
    drop(builder);
    assert!(archive.path.exists());
    assert!(root.exists());
    Ok(())
}

#[test]
fn test_drop_removes_unpackaged_staging() -> Result<()> {
    let temp_base = TempDir::new()?;
    let builder = ArchiveBuilder::new(
        options(temp_base.path(), Compressor::Gzip),
        Arc::new(ProcessorRegistry::new()),
    )?;
    builder.add_metadata("partial", "partial.txt")?;
    let root = builder.staging().root().to_path_buf();
    assert!(root.is_dir());

    drop(builder);
    assert!(!root.exists());
    Ok(())
}

#[test]
fn test_plan_driven_collection() -> Result<()> {
    let temp_base = TempDir::new()?;
    let source = TempDir::new()?;
    let release = source.path().join("os-release");
    fs::write(&release, "NAME=\"Fedora Linux\"\nVERSION_ID=40\n")?;

    let yaml = format!(
        r#"
version: "1.0"
description: "integration"
compressor: none
target_name: {host}
temp_base: {base}
artifacts:
  - kind: file
    path: {release}
    archive_path: /etc/os-release
    name: os_release
metadata:
  - path: branch_info
    content: '{{"remote_branch": -1}}'
processors:
  os_release: [key_value, line_count]
"#,
        host = HOST,
        base = temp_base.path().display(),
        release = release.display(),
    );
    let plan: CollectionPlan = serde_yaml::from_str(&yaml)?;

    let mut builder = ArchiveBuilder::new(plan.archive_options(), Arc::new(plan.build_registry()?))?;
    for spec in &plan.artifacts {
        builder.add_artifact(&spec.to_artifact(), spec.name());
    }
    for entry in &plan.metadata {
        builder.add_metadata(&entry.content, &entry.path)?;
    }

    let archive = builder.package(plan.full_archive)?;
    let entries = read_tar(&archive.path)?;

    assert_eq!(entries["etc/os-release"], "NAME=\"Fedora Linux\"\nVERSION_ID=40\n");
    assert_eq!(entries["branch_info"], r#"{"remote_branch": -1}"#);

    let output: Value = serde_json::from_str(&entries[PROCESSOR_OUTPUT_FILE])?;
    assert_eq!(
        output[HOST]["key_value"],
        json!([{ "NAME": "Fedora Linux", "VERSION_ID": "40" }])
    );
    assert_eq!(output[HOST]["line_count"][0]["lines"], 2);
    Ok(())
}
