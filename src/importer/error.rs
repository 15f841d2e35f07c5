// ==========================================
// 台账导入管道 - 文件级错误
// ==========================================
// 这里的错误都会中止整个文件（结果 completed = false）
// 行级问题不走错误类型，直接记入 ImportResult 诊断
// ==========================================

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 打开文件 =====
    #[error("上传文件不存在: {0}")]
    FileNotFound(String),

    #[error("不支持的文件扩展名: {0}（可用 .xlsx/.xlsm/.xls/.xlsb/.ods/.csv/.tsv/.txt）")]
    UnsupportedFormat(String),

    // ===== 读取行 =====
    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("工作簿无法解析: {0}")]
    ExcelParseError(String),

    #[error("CSV 记录无法解析: {0}")]
    CsvParseError(String),

    // ===== 表头 =====
    #[error("表头行缺失: 文件不足 {row} 行")]
    HeaderRowMissing { row: usize },

    #[error("表头不匹配 (第 {position} 列): 期望 \"{expected}\"，实际 \"{actual}\"")]
    HeaderMismatch {
        position: usize,
        expected: String,
        actual: String,
    },
}

impl From<io::Error> for ImportError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ImportError::FileNotFound(err.to_string())
        } else {
            ImportError::FileReadError(err.to_string())
        }
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        // 非 UTF-8 字节等 IO 层问题归为读取失败
        if err.is_io_error() {
            return ImportError::FileReadError(err.to_string());
        }
        match err.kind() {
            csv::ErrorKind::Utf8 { .. } => ImportError::FileReadError(err.to_string()),
            _ => ImportError::CsvParseError(err.to_string()),
        }
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

pub type ImporterResult<T> = Result<T, ImportError>;
