// ==========================================
// 台账导入管道 - 目标表记录 Repository 实现
// ==========================================
// 事务边界: 每次 batch_* / update_one 调用一个短事务，绝不跨批次
// 时间戳: 插入写 created_at + updated_at，更新只写 updated_at
// ==========================================

use crate::domain::FieldRecord;
use crate::repository::entity_record_repo::{EntityRecordRepository, TableTarget};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_builder::{
    build_exists_sql, build_insert_or_ignore_sql, build_update_by_key_sql,
};
use chrono::Local;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

fn now_text() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 一条记录的 UPDATE 语句与绑定值（SET 非主键列 + updated_at，WHERE 主键）
fn update_statement(target: TableTarget<'_>, record: &FieldRecord, now: &str) -> (String, Vec<Value>) {
    let mut set_columns: Vec<&str> = record
        .field_names()
        .filter(|name| !target.key_fields.contains(name))
        .collect();
    let mut values = record.values_for(&set_columns);
    set_columns.push(UPDATED_AT);
    values.push(Value::Text(now.to_string()));
    values.extend(record.values_for(target.key_fields));

    (
        build_update_by_key_sql(target.table, &set_columns, target.key_fields),
        values,
    )
}

// ==========================================
// EntityRecordRepositoryImpl
// ==========================================
pub struct EntityRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl EntityRecordRepositoryImpl {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl EntityRecordRepository for EntityRecordRepositoryImpl {
    fn exists(&self, target: TableTarget<'_>, record: &FieldRecord) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let sql = build_exists_sql(target.table, target.key_fields);
        let found: Option<i64> = conn
            .query_row(
                &sql,
                params_from_iter(record.values_for(target.key_fields)),
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn batch_insert(
        &self,
        target: TableTarget<'_>,
        records: &[FieldRecord],
    ) -> RepositoryResult<usize> {
        let first = match records.first() {
            Some(first) => first,
            None => return Ok(0),
        };

        let mut columns: Vec<&str> = first.field_names().collect();
        columns.push(CREATED_AT);
        columns.push(UPDATED_AT);
        let sql = build_insert_or_ignore_sql(target.table, &columns);
        let now = now_text();

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                let values = record
                    .values()
                    .cloned()
                    .chain([Value::Text(now.clone()), Value::Text(now.clone())]);
                inserted += stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn batch_update(
        &self,
        target: TableTarget<'_>,
        records: &[FieldRecord],
    ) -> RepositoryResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = now_text();
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut updated = 0;
        for record in records {
            let (sql, values) = update_statement(target, record, &now);
            let mut stmt = tx.prepare_cached(&sql)?;
            updated += stmt.execute(params_from_iter(values))?;
        }

        if updated != records.len() {
            // tx 在此处 drop → 回滚
            return Err(RepositoryError::AffectedRowsMismatch {
                expected: records.len(),
                actual: updated,
            });
        }
        tx.commit()?;

        Ok(updated)
    }

    fn update_one(&self, target: TableTarget<'_>, record: &FieldRecord) -> RepositoryResult<usize> {
        let now = now_text();
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let (sql, values) = update_statement(target, record, &now);
        let updated = tx.execute(&sql, params_from_iter(values))?;
        if updated != 1 {
            return Err(RepositoryError::AffectedRowsMismatch {
                expected: 1,
                actual: updated,
            });
        }
        tx.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: TableTarget<'static> = TableTarget {
        table: "items",
        key_fields: &["code"],
    };

    fn setup() -> EntityRecordRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (
                code TEXT PRIMARY KEY,
                name TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .unwrap();
        EntityRecordRepositoryImpl::new(Arc::new(Mutex::new(conn)))
    }

    fn record(row: usize, code: &str, name: &str) -> FieldRecord {
        let mut r = FieldRecord::new(row);
        r.push("code", Value::Text(code.to_string()));
        r.push("name", Value::Text(name.to_string()));
        r
    }

    #[test]
    fn test_insert_or_ignore_counts_actual_rows() {
        let repo = setup();
        let inserted = repo
            .batch_insert(
                TARGET,
                &[record(2, "A", "a"), record(3, "A", "dup"), record(4, "B", "b")],
            )
            .unwrap();
        assert_eq!(inserted, 2);
        assert!(repo.exists(TARGET, &record(0, "A", "")).unwrap());
        assert!(!repo.exists(TARGET, &record(0, "Z", "")).unwrap());
    }

    #[test]
    fn test_batch_update_rolls_back_on_mismatch() {
        let repo = setup();
        repo.batch_insert(TARGET, &[record(2, "A", "a")]).unwrap();

        let err = repo
            .batch_update(TARGET, &[record(3, "A", "renamed"), record(4, "MISSING", "x")])
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::AffectedRowsMismatch {
                expected: 2,
                actual: 1
            }
        ));

        let conn = repo.get_conn().unwrap();
        let name: String = conn
            .query_row("SELECT name FROM items WHERE code = 'A'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "a");
    }

    #[test]
    fn test_update_one() {
        let repo = setup();
        repo.batch_insert(TARGET, &[record(2, "A", "a")]).unwrap();
        assert_eq!(repo.update_one(TARGET, &record(3, "A", "b")).unwrap(), 1);
        assert!(repo.update_one(TARGET, &record(3, "Q", "b")).is_err());
    }
}
