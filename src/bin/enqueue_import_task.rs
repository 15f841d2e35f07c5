// Small ops utility: enqueue one pending import task, the same way the upload handler does.
//
// Usage:
//   cargo run --bin enqueue_import_task -- <db_path> <target_data_name> <file_path> [uploaded_by]

use anyhow::Context;
use chrono::Local;
use ledger_import::db::open_sqlite_connection;
use ledger_import::domain::{NewImportTask, TargetData};
use ledger_import::logging;
use ledger_import::repository::{ImportTaskRepository, ImportTaskRepositoryImpl};
use std::sync::{Arc, Mutex};

const USAGE: &str = "usage: enqueue_import_task <db_path> <target_data_name> <file_path> [uploaded_by]";

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args.next().context(USAGE)?;
    let target = args.next().context(USAGE)?;
    let file_path = args.next().context(USAGE)?;
    let uploaded_by = args.next();

    if TargetData::parse(&target).is_none() {
        tracing::warn!(target = %target, "unknown target; the runner will finish this task as service_return_error");
    }

    let stored = std::fs::canonicalize(&file_path)
        .with_context(|| format!("cannot resolve file path: {}", file_path))?;
    let original_file_name = stored
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.clone());

    let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));
    let repo = ImportTaskRepositoryImpl::new(conn);
    let task_id = repo.insert_pending(
        &NewImportTask {
            target_data_name: target,
            original_file_name,
            stored_file_path: stored.display().to_string(),
            uploaded_by,
        },
        &Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    )?;

    println!("task_id={}", task_id);
    Ok(())
}
