// ==========================================
// 台账导入管道 - 目标表记录 Repository Trait
// ==========================================
// 职责: 按业务主键判断存在性、批量插入、批量/单行更新
// 红线: Repository 不含业务规则（路由与计数由批次引擎负责）
// ==========================================

use crate::domain::FieldRecord;
use crate::repository::error::RepositoryResult;

/// 目标表定位信息（表名 + 业务主键列）
#[derive(Debug, Clone, Copy)]
pub struct TableTarget<'a> {
    pub table: &'a str,
    pub key_fields: &'a [&'a str],
}

// ==========================================
// EntityRecordRepository Trait
// ==========================================
// 用途: 六种实体共用的落库接口
// 实现者: EntityRecordRepositoryImpl（使用 rusqlite）
pub trait EntityRecordRepository: Send + Sync {
    /// 按业务主键查询记录是否存在（写入前的即时读）
    fn exists(&self, target: TableTarget<'_>, record: &FieldRecord) -> RepositoryResult<bool>;

    /// 批量插入（INSERT OR IGNORE，一个事务）
    ///
    /// # 返回
    /// - Ok(usize): 实际插入的行数（主键冲突被忽略的行不计入）
    /// - Err: 数据库错误（整个事务回滚）
    fn batch_insert(
        &self,
        target: TableTarget<'_>,
        records: &[FieldRecord],
    ) -> RepositoryResult<usize>;

    /// 批量更新（一个事务）
    ///
    /// # 返回
    /// - Ok(usize): 更新的行数，必等于 records.len()
    /// - Err(AffectedRowsMismatch): 影响行数不一致，事务已回滚
    /// - Err: 数据库错误（整个事务回滚）
    fn batch_update(
        &self,
        target: TableTarget<'_>,
        records: &[FieldRecord],
    ) -> RepositoryResult<usize>;

    /// 单行立即更新（独立事务）
    fn update_one(&self, target: TableTarget<'_>, record: &FieldRecord) -> RepositoryResult<usize>;
}
