// ==========================================
// 台账导入管道 - 配置管理器
// ==========================================
// 职责: 读取运行参数（批次大小、保留天数等）
// 存储: config_kv 表 (scope_id='global')，表或键不存在时使用默认值
// ==========================================

use crate::db::{configure_sqlite_connection, table_exists};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ImportSettings - 导入运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSettings {
    /// 批次提交阈值（行）
    pub batch_size: usize,
    /// 归档保留天数
    pub archive_retention_days: u64,
    /// result_message 最大字符数
    pub result_message_max_chars: usize,
    /// result_message 中保留的诊断条数
    pub error_summary_limit: usize,
    /// 每处理多少行输出一次进度/内存日志（0 = 关闭）
    pub memory_log_interval_rows: usize,
    /// 金额/单价小数位
    pub decimal_scale: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size: 200,
            archive_retention_days: 5,
            result_message_max_chars: 2000,
            error_summary_limit: 10,
            memory_log_interval_rows: 5000,
            decimal_scale: 2,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在，或 config_kv 表不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        if !table_exists(&conn, "config_kv")? {
            return Ok(None);
        }

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 获取所有 global 配置的快照（按键排序，调度器认领前输出到日志）
    pub fn get_config_snapshot(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut snapshot = BTreeMap::new();
        if !table_exists(&conn, "config_kv")? {
            return Ok(snapshot);
        }

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }

    /// 加载导入运行参数（缺失/格式错误的项使用默认值）
    pub fn load_import_settings(&self) -> RepositoryResult<ImportSettings> {
        let defaults = ImportSettings::default();

        Ok(ImportSettings {
            batch_size: self.positive_or_default(config_keys::IMPORT_BATCH_SIZE, defaults.batch_size)?,
            archive_retention_days: self.parse_or_default(
                config_keys::ARCHIVE_RETENTION_DAYS,
                defaults.archive_retention_days,
            )?,
            result_message_max_chars: self.positive_or_default(
                config_keys::RESULT_MESSAGE_MAX_CHARS,
                defaults.result_message_max_chars,
            )?,
            error_summary_limit: self.parse_or_default(
                config_keys::ERROR_SUMMARY_LIMIT,
                defaults.error_summary_limit,
            )?,
            memory_log_interval_rows: self.parse_or_default(
                config_keys::MEMORY_LOG_INTERVAL_ROWS,
                defaults.memory_log_interval_rows,
            )?,
            decimal_scale: self
                .parse_or_default(config_keys::DECIMAL_SCALE, defaults.decimal_scale)?
                .min(6),
        })
    }

    fn parse_or_default<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(raw) => raw,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    fn positive_or_default(&self, key: &str, default: usize) -> RepositoryResult<usize> {
        let value = self.parse_or_default(key, default)?;
        if value == 0 {
            tracing::warn!(config_key = key, default, "配置值必须大于 0，使用默认值");
            return Ok(default);
        }
        Ok(value)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批次
    pub const IMPORT_BATCH_SIZE: &str = "import_batch_size";
    pub const DECIMAL_SCALE: &str = "decimal_scale";

    // 归档
    pub const ARCHIVE_RETENTION_DAYS: &str = "archive_retention_days";

    // 结果信息
    pub const RESULT_MESSAGE_MAX_CHARS: &str = "result_message_max_chars";
    pub const ERROR_SUMMARY_LIMIT: &str = "error_summary_limit";

    // 诊断
    pub const MEMORY_LOG_INTERVAL_ROWS: &str = "memory_log_interval_rows";
}
