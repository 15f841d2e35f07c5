// ==========================================
// 台账导入管道 - 核心库
// ==========================================
// 职责: 定时调度的单实例导入任务管道
// 技术栈: Rust + SQLite (rusqlite) + calamine/csv
// 组成: 调度 → 实体导入服务 → 批次引擎 → 归档
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 任务、结果、记录与枚举
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 表格读取、转换、批次落库
pub mod importer;

// 配置层 - 启动路径与运行参数
pub mod config;

// 调度层 - 文件锁、任务认领、崩溃兜底
pub mod scheduler;

// 归档层 - 状态分区归档与保留期清理
pub mod archive;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 性能诊断
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{ArchiveStatus, ImportResult, ImportTask, TargetData, TaskStatus};
pub use importer::{BatchImportEngine, EntityImportService, ImportServiceRegistry};
pub use scheduler::{RunContext, RunOutcome, TaskRunner};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "台账导入管道";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
