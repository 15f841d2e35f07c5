// ==========================================
// 台账导入管道 - 领域层
// ==========================================
// 职责: 导入任务、导入结果、目标表记录与基础枚举
// ==========================================

pub mod import_result;
pub mod record;
pub mod task;
pub mod types;

pub use import_result::ImportResult;
pub use record::FieldRecord;
pub use task::{ImportTask, NewImportTask};
pub use types::{ArchiveStatus, TargetData, TaskStatus};
