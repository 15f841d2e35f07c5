// ==========================================
// 台账导入管道 - 配置层
// ==========================================
// 职责: 启动路径（文件系统/环境变量）与运行参数（config_kv 表）
// ==========================================

pub mod config_manager;
pub mod runner_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager, ImportSettings};
pub use runner_config::RunnerConfig;
