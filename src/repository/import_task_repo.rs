// ==========================================
// 台账导入管道 - 导入任务 Repository Trait
// ==========================================
// 职责: import_tasks 表的查询与状态推进
// 红线: 状态推进均为条件更新（WHERE status = ...），不做无条件覆盖
// ==========================================

use crate::domain::{ImportTask, NewImportTask, TaskStatus};
use crate::repository::error::RepositoryResult;

// ==========================================
// ImportTaskRepository Trait
// ==========================================
// 用途: 调度器认领/完结任务，入队工具写入待处理任务
// 实现者: ImportTaskRepositoryImpl（使用 rusqlite）
pub trait ImportTaskRepository: Send + Sync {
    /// 查询任一 processing 状态的任务
    fn find_processing(&self) -> RepositoryResult<Option<ImportTask>>;

    /// 查询最早入队的 pending 任务（uploaded_at, id 升序）
    fn find_oldest_pending(&self) -> RepositoryResult<Option<ImportTask>>;

    /// pending → processing，写入开始时间（独立提交）
    ///
    /// # 返回
    /// - Err(ClaimConflict): 任务已不是 pending
    fn mark_processing(&self, task_id: i64, started_at: &str) -> RepositoryResult<()>;

    /// processing → 终态，写入完成时间与结果信息
    fn mark_finished(
        &self,
        task_id: i64,
        status: TaskStatus,
        finished_at: &str,
        result_message: &str,
    ) -> RepositoryResult<()>;

    /// 强制失败（崩溃/信号路径），仅对仍处于 processing 的任务生效
    ///
    /// # 返回
    /// - Ok(true): 已标记
    /// - Ok(false): 任务已是终态，未改动
    fn force_fail(&self, task_id: i64, finished_at: &str, result_message: &str)
        -> RepositoryResult<bool>;

    /// 入队一个 pending 任务，返回任务 ID
    fn insert_pending(&self, task: &NewImportTask, uploaded_at: &str) -> RepositoryResult<i64>;

    fn get(&self, task_id: i64) -> RepositoryResult<Option<ImportTask>>;
}
