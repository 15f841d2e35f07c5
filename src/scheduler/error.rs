// ==========================================
// 台账导入管道 - 调度层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 任务本身的失败（表头不匹配等）不是 RunnerError，
//       而是分类后的任务结果；这里只描述调度器自身无法继续的情况
// ==========================================

use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("锁文件操作失败 ({path}): {source}")]
    LockFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("数据库打开失败: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result 类型别名
pub type RunnerResult<T> = Result<T, RunnerError>;
