// ==========================================
// 台账导入管道 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，上游写入任务时减少偶发 busy 错误
// - 表结构由上游维护，这里只做存在性检查（不做自动迁移）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::Path;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 导入管道依赖的外部表（config_kv 可选，不在此列）
pub const REQUIRED_TABLES: &[&str] = &[
    "import_tasks",
    "products",
    "manufacturers",
    "purchase_slip",
    "sales_slip",
    "transfer_slip",
    "order_slip",
];

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: impl AsRef<Path>) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1 LIMIT 1",
            [table],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

/// 返回 names 中数据库里不存在的表（用于启动告警）
pub fn missing_tables(conn: &Connection, names: &[&str]) -> rusqlite::Result<Vec<String>> {
    let mut missing = Vec::new();
    for name in names {
        if !table_exists(conn, name)? {
            missing.push(name.to_string());
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        conn.execute_batch("CREATE TABLE products (jan_code TEXT PRIMARY KEY);")
            .unwrap();

        let missing = missing_tables(&conn, &["products", "manufacturers"]).unwrap();
        assert_eq!(missing, vec!["manufacturers".to_string()]);
    }
}
