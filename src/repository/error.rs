// ==========================================
// 台账导入管道 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 调用方据此区分: 认领冲突（守卫退出）/ 批次失败（回滚并跳过）/ 其他（调度器错误）
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 任务状态推进 =====
    #[error("任务认领失败: task_id={task_id} 已不是 pending 状态")]
    ClaimConflict { task_id: i64 },

    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    // ===== 批次写入 =====
    #[error("影响行数不一致: 期望 {expected}，实际 {actual}")]
    AffectedRowsMismatch { expected: usize, actual: usize },

    /// 约束或触发器拒绝（NOT NULL / CHECK / RAISE 等）
    #[error("数据库约束拒绝: {0}")]
    ConstraintRejected(String),

    /// 上游写入方持有数据库锁，busy_timeout 内未能获取
    #[error("数据库忙: {0}")]
    DatabaseBusy(String),

    // ===== 其他 =====
    #[error("数据库连接锁获取失败: {0}")]
    LockError(String),

    #[error("数据库操作失败: {0}")]
    Sqlite(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        let code = err.sqlite_error_code();
        let message = match &err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
            other => other.to_string(),
        };
        match code {
            Some(ErrorCode::ConstraintViolation) => RepositoryError::ConstraintRejected(message),
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                RepositoryError::DatabaseBusy(message)
            }
            _ => RepositoryError::Sqlite(message),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_trigger_abort_maps_to_constraint_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (a TEXT NOT NULL);
             CREATE TRIGGER deny BEFORE INSERT ON t WHEN NEW.a = 'x'
             BEGIN SELECT RAISE(ABORT, 'denied'); END;",
        )
        .unwrap();

        let err: RepositoryError = conn
            .execute("INSERT INTO t (a) VALUES ('x')", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ConstraintRejected(ref m) if m.contains("denied")));

        let err: RepositoryError = conn
            .execute("INSERT INTO t (a) VALUES (NULL)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ConstraintRejected(_)));
    }

    #[test]
    fn test_other_errors_keep_message() {
        let conn = Connection::open_in_memory().unwrap();
        let err: RepositoryError = conn.execute("SELECT * FROM missing", []).unwrap_err().into();
        assert!(matches!(err, RepositoryError::Sqlite(ref m) if m.contains("missing")));
    }
}
