//! Tests for the CSV import module.

use super::*;
use milvus_client::DataType;
use std::io::Write;
use tempfile::tempdir;

fn books(dynamic: bool) -> CollectionInfo {
    CollectionInfo {
        name: "books".to_string(),
        fields: vec![
            FieldSchema::new("id", DataType::Int64).primary(),
            FieldSchema::new("title", DataType::VarChar).with_max_length(32),
            FieldSchema::new("vec", DataType::FloatVector).with_dim(2),
        ],
        enable_dynamic_field: dynamic,
        ..CollectionInfo::default()
    }
}

fn write_csv(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("rows.csv");
    let mut file = File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn quiet(batch_size: usize) -> ImportConfig {
    ImportConfig {
        batch_size,
        show_progress: false,
    }
}

// =========================================================================
// ImportStats
// =========================================================================

#[test]
fn test_import_stats_default() {
    let stats = ImportStats::default();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.imported, 0);
    assert_eq!(stats.errors, 0);
}

#[test]
fn test_import_stats_records_per_sec() {
    let stats = ImportStats {
        total: 100,
        imported: 1000,
        errors: 0,
        duration_ms: 500,
    };
    assert!((stats.records_per_sec() - 2000.0).abs() < 0.001);
    assert!(ImportStats::default().records_per_sec().abs() < f64::EPSILON);
}

// =========================================================================
// import_csv
// =========================================================================

#[test]
fn test_import_batches_and_coerces_cells() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "id,title,vec\n1,Dune,\"[0.1, 0.2]\"\n2,Emma,\"[0.3, 0.4]\"\n3,Ulysses,\"[0.5, 0.6]\"\n",
    );
    let mut batches = Vec::new();
    let stats = import_csv(&path, &books(false), &quiet(2), |rows| {
        batches.push(rows.to_vec());
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.imported, 3);
    assert_eq!(stats.errors, 0);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(batches[0][0]["id"], serde_json::json!(1));
    assert_eq!(batches[0][0]["title"], serde_json::json!("Dune"));
    assert_eq!(batches[1][0]["vec"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_bad_rows_are_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "id,title,vec\n1,Dune,\"[0.1, 0.2]\"\nx,Emma,\"[0.3, 0.4]\"\n3,Ulysses,\"[0.5]\"\n",
    );
    let mut submitted = 0;
    let stats = import_csv(&path, &books(false), &quiet(10), |rows| {
        submitted += rows.len();
        Ok(())
    })
    .unwrap();
    assert_eq!(stats.imported, 1);
    assert_eq!(stats.errors, 2);
    assert_eq!(submitted, 1);
}

#[test]
fn test_unknown_column_needs_dynamic_field() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "id,title,vec,year\n1,Dune,\"[0.1, 0.2]\",1965\n");
    let err = import_csv(&path, &books(false), &quiet(10), |_| Ok(())).unwrap_err();
    assert_eq!(err.kind(), "ParameterError");
    assert!(err.to_string().contains("year"));

    let mut rows = Vec::new();
    import_csv(&path, &books(true), &quiet(10), |batch| {
        rows.extend_from_slice(batch);
        Ok(())
    })
    .unwrap();
    assert_eq!(rows[0]["year"], serde_json::json!(1965));
}

#[test]
fn test_missing_required_column_fails() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "id,title\n1,Dune\n");
    let err = import_csv(&path, &books(false), &quiet(10), |_| Ok(())).unwrap_err();
    assert!(err.to_string().contains("'vec'"));
}

#[test]
fn test_empty_and_missing_files() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "id,title,vec\n");
    let err = import_csv(&path, &books(false), &quiet(10), |_| Ok(())).unwrap_err();
    assert!(err.to_string().contains("Empty file"));

    let missing = dir.path().join("nope.csv");
    let err = import_csv(&missing, &books(false), &quiet(10), |_| Ok(())).unwrap_err();
    assert!(err.to_string().contains("Failed to open CSV file"));
}

#[test]
fn test_submit_error_passes_through() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "id,title,vec\n1,Dune,\"[0.1, 0.2]\"\n");
    let err = import_csv(&path, &books(false), &quiet(10), |_| {
        Err(CliError::Remote {
            operation: "Insert".to_string(),
            message: "quota exceeded".to_string(),
        })
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "Insert error!quota exceeded");
}

#[test]
fn test_failed_batch_reports_rows_already_imported() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "id,title,vec\n1,Dune,\"[0.1, 0.2]\"\n2,Emma,\"[0.3, 0.4]\"\n3,Ulysses,\"[0.5, 0.6]\"\n",
    );
    let mut calls = 0;
    let err = import_csv(&path, &books(false), &quiet(2), |_| {
        calls += 1;
        if calls == 1 {
            Ok(())
        } else {
            Err(CliError::Remote {
                operation: "Insert".to_string(),
                message: "quota exceeded".to_string(),
            })
        }
    })
    .unwrap_err();
    assert_eq!(err.kind(), "RemoteOperationError");
    assert_eq!(
        err.to_string(),
        "Insert error!quota exceeded (2 rows were imported before the failure)"
    );
}

#[test]
fn test_auto_id_column_is_skipped() {
    let dir = tempdir().unwrap();
    let mut info = books(false);
    info.fields[0].auto_id = true;
    let path = write_csv(&dir, "id,title,vec\n9,Dune,\"[0.1, 0.2]\"\n");
    let mut rows = Vec::new();
    import_csv(&path, &info, &quiet(10), |batch| {
        rows.extend_from_slice(batch);
        Ok(())
    })
    .unwrap();
    assert!(!rows[0].contains_key("id"));
}
