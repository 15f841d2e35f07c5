// ==========================================
// 台账导入管道 - 归档层
// ==========================================

pub mod archive_manager;

pub use archive_manager::{sanitize_file_name, ArchiveManager};
