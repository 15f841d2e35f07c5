// ==========================================
// 台账导入管道 - 实体导入配置
// ==========================================
// 职责: 描述一种实体文件的布局（表头、列 → 字段映射、必填、业务主键）
// 用法: 批次引擎只依赖本配置，六种实体共用同一套控制流
// ==========================================

use crate::domain::{FieldRecord, TargetData};
use crate::importer::tabular_reader::{RawRow, ReadFilter};
use crate::importer::value_transformer::{
    is_blank, to_db_date, to_db_datetime, to_db_decimal, to_db_integer, to_db_string,
};
use rusqlite::types::Value;

/// 字段取值来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// 单列
    Cell(usize),
    /// 主列为空时退回到备用列（例如颜色名称 → 颜色编码）
    CellOr(usize, usize),
    /// 日期列 + 可选时间列组合为时间戳
    DateTime { date: usize, time: Option<usize> },
}

impl FieldSource {
    /// 用于诊断信息的主列
    pub fn primary_column(&self) -> usize {
        match self {
            FieldSource::Cell(idx) | FieldSource::CellOr(idx, _) => *idx,
            FieldSource::DateTime { date, .. } => *date,
        }
    }
}

/// 字段值类型（决定使用哪个转换器）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    /// 组合时间戳；millis=true 时保留毫秒
    Timestamp { millis: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub source: FieldSource,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub const fn text(field: &'static str, col: usize) -> Self {
        Self::new(field, FieldSource::Cell(col), FieldKind::Text)
    }

    pub const fn integer(field: &'static str, col: usize) -> Self {
        Self::new(field, FieldSource::Cell(col), FieldKind::Integer)
    }

    pub const fn decimal(field: &'static str, col: usize) -> Self {
        Self::new(field, FieldSource::Cell(col), FieldKind::Decimal)
    }

    pub const fn date(field: &'static str, col: usize) -> Self {
        Self::new(field, FieldSource::Cell(col), FieldKind::Date)
    }

    pub const fn text_or(field: &'static str, col: usize, fallback: usize) -> Self {
        Self::new(field, FieldSource::CellOr(col, fallback), FieldKind::Text)
    }

    pub const fn timestamp(field: &'static str, date: usize, time: usize, millis: bool) -> Self {
        Self::new(
            field,
            FieldSource::DateTime {
                date,
                time: Some(time),
            },
            FieldKind::Timestamp { millis },
        )
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn new(field: &'static str, source: FieldSource, kind: FieldKind) -> Self {
        Self {
            field,
            source,
            kind,
            required: false,
        }
    }

    /// 从行中取值并转换为 SQL 值（无法解析 → NULL）
    fn extract(&self, row: &RawRow, decimal_scale: usize) -> Value {
        let cell = match self.source {
            FieldSource::Cell(idx) => row.cell(idx),
            FieldSource::CellOr(idx, fallback) => {
                let primary = row.cell(idx);
                if is_blank(primary) {
                    row.cell(fallback)
                } else {
                    primary
                }
            }
            FieldSource::DateTime { date, time } => {
                let millis = matches!(self.kind, FieldKind::Timestamp { millis: true });
                return to_db_datetime(row.cell(date), time.map(|t| row.cell(t)), millis)
                    .map(Value::Text)
                    .unwrap_or(Value::Null);
            }
        };

        let value = match self.kind {
            FieldKind::Text => to_db_string(cell).map(Value::Text),
            FieldKind::Integer => to_db_integer(cell).map(Value::Integer),
            FieldKind::Decimal => to_db_decimal(cell, decimal_scale).map(Value::Text),
            FieldKind::Date => to_db_date(cell).map(Value::Text),
            FieldKind::Timestamp { millis } => {
                to_db_datetime(cell, None, millis).map(Value::Text)
            }
        };
        value.unwrap_or(Value::Null)
    }
}

/// 更新的提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// 与插入一样积累到阈值后整批提交（主数据）
    Batched,
    /// 命中已有记录时立即单行更新，各自一个事务（传票）
    Immediate,
}

#[derive(Debug)]
pub struct EntityProfile {
    pub target: TargetData,
    pub table: &'static str,
    pub expected_header: &'static [&'static str],
    /// 表头行号（1 起）
    pub header_row: usize,
    pub max_columns: usize,
    pub fields: &'static [FieldSpec],
    pub key_fields: &'static [&'static str],
    pub update_mode: UpdateMode,
}

impl EntityProfile {
    /// 读取过滤器：从表头行开始，只物化前 max_columns 列
    pub fn read_filter(&self) -> ReadFilter {
        ReadFilter::new(self.header_row, self.max_columns)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.field).collect()
    }

    /// 非主键字段（UPDATE 的 SET 部分）
    pub fn value_fields(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .map(|f| f.field)
            .filter(|name| !self.key_fields.contains(name))
            .collect()
    }

    /// 一行源数据 → 目标记录
    pub fn map_row(&self, row: &RawRow, decimal_scale: usize) -> FieldRecord {
        let mut record = FieldRecord::new(row.row_number);
        for spec in self.fields {
            record.push(spec.field, spec.extract(row, decimal_scale));
        }
        record
    }

    /// 必填字段（含业务主键）为空或无法解析时，返回对应的列名
    pub fn missing_required(&self, record: &FieldRecord) -> Vec<String> {
        self.fields
            .iter()
            .filter(|spec| spec.required || self.key_fields.contains(&spec.field))
            .filter(|spec| record.is_null(spec.field))
            .map(|spec| self.column_label(spec))
            .collect()
    }

    fn column_label(&self, spec: &FieldSpec) -> String {
        match self.expected_header.get(spec.source.primary_column()) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => spec.field.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::tabular_reader::CellValue;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::text("code", 0).required(),
        FieldSpec::integer("line_number", 1),
        FieldSpec::text("color_code", 2),
        FieldSpec::text_or("color_name", 3, 2),
        FieldSpec::decimal("price", 4),
        FieldSpec::timestamp("happened_at", 5, 6, true),
    ];

    const PROFILE: EntityProfile = EntityProfile {
        target: TargetData::PurchaseSlip,
        table: "demo",
        expected_header: &["编码", "行号", "颜色编码", "颜色名称", "单价", "日期", "时间"],
        header_row: 2,
        max_columns: 7,
        fields: FIELDS,
        key_fields: &["code", "line_number"],
        update_mode: UpdateMode::Immediate,
    };

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn test_map_row_applies_transformers_and_fallback() {
        let row = RawRow {
            row_number: 3,
            cells: vec![
                text(" A01 "),
                text("1.00"),
                text("RED"),
                CellValue::Empty,
                text("１,２３４.５"),
                text("2025/04/01"),
                text("13:45:30"),
            ],
        };

        let record = PROFILE.map_row(&row, 2);
        assert_eq!(record.row_number, 3);
        assert_eq!(record.get("code"), Some(&Value::Text("A01".to_string())));
        assert_eq!(record.get("line_number"), Some(&Value::Integer(1)));
        assert_eq!(record.get("color_name"), Some(&Value::Text("RED".to_string())));
        assert_eq!(record.get("price"), Some(&Value::Text("1234.50".to_string())));
        assert_eq!(
            record.get("happened_at"),
            Some(&Value::Text("2025-04-01 13:45:30.000".to_string()))
        );
        assert!(PROFILE.missing_required(&record).is_empty());
    }

    #[test]
    fn test_missing_required_and_key_use_header_labels() {
        let row = RawRow {
            row_number: 4,
            cells: vec![CellValue::Empty, text("x")],
        };
        let record = PROFILE.map_row(&row, 2);
        assert_eq!(PROFILE.missing_required(&record), vec!["编码", "行号"]);
    }

    #[test]
    fn test_value_fields_exclude_keys() {
        assert_eq!(
            PROFILE.value_fields(),
            vec!["color_code", "color_name", "price", "happened_at"]
        );
        assert_eq!(PROFILE.read_filter(), ReadFilter::new(2, 7));
    }
}
