// ==========================================
// 台账导入管道 - 表头校验器
// ==========================================
// 规则: 逐列比较（忽略大小写/首尾空白/全角差异）
// 期望值为空字符串的列不检查
// 任何不匹配 → 整个文件中止，零行处理
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::tabular_reader::RawRow;
use crate::importer::value_transformer::normalize_width;

pub struct HeaderValidator;

impl HeaderValidator {
    /// 校验表头行
    ///
    /// # 参数
    /// - header_row: 配置的表头行号（1 起）
    /// - row: 读取到的表头行；文件行数不足时为 None
    /// - expected: 期望表头（前缀匹配，"" 表示跳过该列）
    pub fn validate(
        header_row: usize,
        row: Option<&RawRow>,
        expected: &[&str],
    ) -> ImporterResult<()> {
        let row = match row {
            Some(row) if row.row_number == header_row => row,
            _ => return Err(ImportError::HeaderRowMissing { row: header_row }),
        };

        for (idx, expected_name) in expected.iter().enumerate() {
            let expected_norm = Self::normalize(expected_name);
            if expected_norm.is_empty() {
                continue;
            }

            let actual = row.cell(idx).as_text();
            if Self::normalize(&actual) != expected_norm {
                return Err(ImportError::HeaderMismatch {
                    position: idx + 1,
                    expected: expected_name.to_string(),
                    actual,
                });
            }
        }

        Ok(())
    }

    fn normalize(value: &str) -> String {
        normalize_width(value).trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::tabular_reader::CellValue;

    fn row(number: usize, cells: &[&str]) -> RawRow {
        RawRow {
            row_number: number,
            cells: cells
                .iter()
                .map(|c| {
                    if c.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(c.to_string())
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_case_insensitive_and_blank_expected_skipped() {
        let header = row(1, &[" jan编码 ", "商品名称", "任意备注"]);
        assert!(HeaderValidator::validate(1, Some(&header), &["JAN编码", "商品名称", ""]).is_ok());
    }

    #[test]
    fn test_extra_actual_columns_are_ignored() {
        let header = row(2, &["输入编号", "行号", "多余列"]);
        assert!(HeaderValidator::validate(2, Some(&header), &["输入编号", "行号"]).is_ok());
    }

    #[test]
    fn test_mismatch_reports_position() {
        let header = row(1, &["JAN编码", "品名"]);
        let err = HeaderValidator::validate(1, Some(&header), &["JAN编码", "商品名称"]).unwrap_err();
        match err {
            ImportError::HeaderMismatch {
                position,
                expected,
                actual,
            } => {
                assert_eq!(position, 2);
                assert_eq!(expected, "商品名称");
                assert_eq!(actual, "品名");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_expected_column_is_mismatch() {
        let header = row(1, &["JAN编码"]);
        let err = HeaderValidator::validate(1, Some(&header), &["JAN编码", "商品名称"]).unwrap_err();
        assert!(matches!(err, ImportError::HeaderMismatch { position: 2, .. }));
    }

    #[test]
    fn test_missing_header_row() {
        let err = HeaderValidator::validate(2, None, &["输入编号"]).unwrap_err();
        assert!(matches!(err, ImportError::HeaderRowMissing { row: 2 }));
    }
}
