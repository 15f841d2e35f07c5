// ==========================================
// 台账导入管道 - 导入任务 Repository 实现
// ==========================================

use crate::domain::{ImportTask, NewImportTask, TaskStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_task_repo::ImportTaskRepository;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT id, status, target_data_name, original_file_name, stored_file_path,
           uploaded_at, uploaded_by, processing_started_at, processing_finished_at,
           result_message
    FROM import_tasks
"#;

fn map_task(row: &Row<'_>) -> rusqlite::Result<ImportTask> {
    let status_raw: String = row.get(1)?;
    let status = TaskStatus::from_str(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("未知任务状态: {}", status_raw).into(),
        )
    })?;

    Ok(ImportTask {
        id: row.get(0)?,
        status,
        target_data_name: row.get(2)?,
        original_file_name: row.get(3)?,
        stored_file_path: row.get(4)?,
        uploaded_at: row.get(5)?,
        uploaded_by: row.get(6)?,
        processing_started_at: row.get(7)?,
        processing_finished_at: row.get(8)?,
        result_message: row.get(9)?,
    })
}

// ==========================================
// ImportTaskRepositoryImpl
// ==========================================
pub struct ImportTaskRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportTaskRepositoryImpl {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_one(&self, clause: &str, task_id: Option<i64>) -> RepositoryResult<Option<ImportTask>> {
        let conn = self.get_conn()?;
        let sql = format!("{} {}", SELECT_COLUMNS, clause);
        let task = match task_id {
            Some(id) => conn.query_row(&sql, params![id], map_task).optional()?,
            None => conn.query_row(&sql, [], map_task).optional()?,
        };
        Ok(task)
    }
}

impl ImportTaskRepository for ImportTaskRepositoryImpl {
    fn find_processing(&self) -> RepositoryResult<Option<ImportTask>> {
        self.query_one("WHERE status = 'processing' ORDER BY id LIMIT 1", None)
    }

    fn find_oldest_pending(&self) -> RepositoryResult<Option<ImportTask>> {
        self.query_one(
            "WHERE status = 'pending' ORDER BY uploaded_at ASC, id ASC LIMIT 1",
            None,
        )
    }

    fn mark_processing(&self, task_id: i64, started_at: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE import_tasks
            SET status = 'processing', processing_started_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![task_id, started_at],
        )?;
        if rows == 0 {
            return Err(RepositoryError::ClaimConflict { task_id });
        }
        Ok(())
    }

    fn mark_finished(
        &self,
        task_id: i64,
        status: TaskStatus,
        finished_at: &str,
        result_message: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE import_tasks
            SET status = ?2, processing_finished_at = ?3, result_message = ?4
            WHERE id = ?1 AND status = 'processing'
            "#,
            params![task_id, status.as_str(), finished_at, result_message],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "import_tasks(processing)".to_string(),
                id: task_id.to_string(),
            });
        }
        Ok(())
    }

    fn force_fail(
        &self,
        task_id: i64,
        finished_at: &str,
        result_message: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE import_tasks
            SET status = 'failed', processing_finished_at = ?2, result_message = ?3
            WHERE id = ?1 AND status = 'processing'
            "#,
            params![task_id, finished_at, result_message],
        )?;
        Ok(rows > 0)
    }

    fn insert_pending(&self, task: &NewImportTask, uploaded_at: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_tasks (
                status, target_data_name, original_file_name, stored_file_path,
                uploaded_at, uploaded_by
            ) VALUES ('pending', ?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                task.target_data_name,
                task.original_file_name,
                task.stored_file_path,
                uploaded_at,
                task.uploaded_by,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get(&self, task_id: i64) -> RepositoryResult<Option<ImportTask>> {
        self.query_one("WHERE id = ?1", Some(task_id))
    }
}
