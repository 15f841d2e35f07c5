// ==========================================
// 台账导入管道 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有值使用参数化绑定
// ==========================================

pub mod entity_record_repo;
pub mod entity_record_repo_impl;
pub mod error;
pub mod import_task_repo;
pub mod import_task_repo_impl;
pub mod sql_builder;

pub use entity_record_repo::{EntityRecordRepository, TableTarget};
pub use entity_record_repo_impl::EntityRecordRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
pub use import_task_repo::ImportTaskRepository;
pub use import_task_repo_impl::ImportTaskRepositoryImpl;
