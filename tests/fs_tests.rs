//! Tests for the synchronous facade operations.

use std::collections::HashSet;
use std::fs;

use anyhow::Result;
use fsaccess::{
    Encoding, Error, FileSystem, ReadOptions, delete, ensure_parent_dirs, exists, read_dir,
    read_json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::{NamedTempFile, TempDir};

#[test]
fn exists_matches_disk_state() -> Result<()> {
    let file = NamedTempFile::new()?;
    assert!(exists(file.path())?);

    let temp = TempDir::new()?;
    assert!(!exists(temp.path().join("no-such-entry-3f9a1c"))?);
    Ok(())
}

#[test]
fn read_dir_lists_immediate_children() -> Result<()> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("x"), "")?;
    fs::write(temp.path().join("y"), "")?;

    let names: HashSet<String> = read_dir(temp.path())?.into_iter().collect();

    assert_eq!(names, HashSet::from(["x".to_string(), "y".to_string()]));
    Ok(())
}

#[test]
fn read_dir_is_not_recursive() -> Result<()> {
    let temp = TempDir::new()?;
    fs::create_dir_all(temp.path().join("sub/deeper"))?;
    fs::write(temp.path().join("sub/deeper/file"), "")?;

    assert_eq!(read_dir(temp.path())?, vec!["sub".to_string()]);
    Ok(())
}

#[test]
fn json_values_round_trip() -> Result<()> {
    let temp = TempDir::new()?;
    let values = [
        json!({}),
        json!({"outer": {"inner": [1, 2, {"deep": true}]}, "name": "fsaccess"}),
        json!([1, "two", null, 3.5]),
        json!("just a string"),
        json!(42),
        json!(true),
        json!(null),
    ];

    for (i, value) in values.iter().enumerate() {
        let path = temp.path().join(format!("value-{i}.json"));
        fs::write(&path, serde_json::to_vec(value)?)?;

        let read: Value = read_json(&path, &ReadOptions::default())?;
        assert_eq!(&read, value);
    }
    Ok(())
}

#[test]
fn read_json_into_typed_value() -> Result<()> {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Manifest {
        name: String,
        version: u32,
    }

    let temp = TempDir::new()?;
    let path = temp.path().join("manifest.json");
    fs::write(&path, r#"{"name": "bundle", "version": 3}"#)?;

    let manifest: Manifest = FileSystem::new().read_json(&path, &ReadOptions::default())?;

    assert_eq!(
        manifest,
        Manifest {
            name: "bundle".into(),
            version: 3
        }
    );
    Ok(())
}

#[test]
fn read_json_honours_encoding() -> Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("latin1.json");
    fs::write(&path, b"\"caf\xe9\"")?;

    let latin1 = ReadOptions::new().with_encoding(Encoding::Latin1);
    let value: String = read_json(&path, &latin1)?;
    assert_eq!(value, "café");

    let strict = ReadOptions::new().with_encoding(Encoding::Utf8);
    let err = read_json::<String>(&path, &strict).unwrap_err();
    assert!(matches!(err, Error::Io { .. }), "{err}");
    Ok(())
}

#[test]
fn read_json_reports_missing_and_malformed_files() -> Result<()> {
    let temp = TempDir::new()?;

    let err = read_json::<Value>(temp.path().join("missing.json"), &ReadOptions::default())
        .unwrap_err();
    assert!(err.is_not_found());

    let path = temp.path().join("broken.json");
    fs::write(&path, "{\"unterminated\": ")?;
    let err = read_json::<Value>(&path, &ReadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedJson { .. }), "{err}");
    Ok(())
}

#[test]
fn delete_missing_path_succeeds() -> Result<()> {
    let temp = TempDir::new()?;
    delete(temp.path().join("never-existed"))?;
    delete(temp.path().join("never/existed/either"))?;
    Ok(())
}

#[test]
fn delete_removes_whole_tree() -> Result<()> {
    let temp = TempDir::new()?;
    let root = temp.path().join("tree");
    fs::create_dir_all(root.join("a/b"))?;
    fs::write(root.join("top.txt"), "1")?;
    fs::write(root.join("a/b/leaf.txt"), "2")?;

    FileSystem::new().delete(&root)?;

    assert!(!exists(&root)?);
    assert!(exists(temp.path())?);
    Ok(())
}

#[tokio::test]
async fn ensure_parent_dirs_twice_is_stable() -> Result<()> {
    let temp = TempDir::new()?;
    let target = temp.path().join("p/q/r/file.json");

    ensure_parent_dirs(&target).await?;
    ensure_parent_dirs(&target).await?;

    assert!(temp.path().join("p/q/r").is_dir());
    assert_eq!(read_dir(temp.path().join("p/q/r"))?, Vec::<String>::new());
    Ok(())
}
