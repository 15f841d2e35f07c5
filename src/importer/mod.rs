// ==========================================
// 台账导入管道 - 导入层
// ==========================================
// 职责: 表格文件 → 目标表
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods), CSV, TSV
// 组成: 读取适配器 / 值转换 / 表头校验 / 批次引擎 / 实体布局
// ==========================================

// 模块声明
pub mod batch_engine;
pub mod entity_profile;
pub mod error;
pub mod header_validator;
pub mod import_service;
pub mod profiles;
pub mod tabular_reader;
pub mod value_transformer;

// 重导出核心类型
pub use batch_engine::{BatchImportEngine, RowBatch};
pub use entity_profile::{EntityProfile, FieldKind, FieldSource, FieldSpec, UpdateMode};
pub use error::{ImportError, ImporterResult};
pub use header_validator::HeaderValidator;
pub use import_service::{EntityImportService, ImportServiceRegistry, TableImportService};
pub use tabular_reader::{
    CellValue, RawRow, ReadFilter, RowCursor, TabularReader, UniversalTabularReader,
};
