// ==========================================
// 台账导入管道 - 目标表记录
// ==========================================
// 用途: 一行源数据经字段映射后的落库形态（字段名 → SQL 值）
// 生命周期: 仅在批次缓冲内，flush 后丢弃
// ==========================================

use rusqlite::types::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    /// 源文件行号（1 起，用于诊断）
    pub row_number: usize,
    fields: Vec<(&'static str, Value)>,
}

impl FieldRecord {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            fields: Vec::new(),
        }
    }

    pub fn push(&mut self, field: &'static str, value: Value) {
        self.fields.push((field, value));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, v)| v)
    }

    /// 字段值为 NULL 或不存在
    pub fn is_null(&self, field: &str) -> bool {
        matches!(self.get(field), None | Some(Value::Null))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(name, _)| *name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// 按字段名顺序取值（缺失字段取 NULL）
    pub fn values_for(&self, names: &[&str]) -> Vec<Value> {
        names
            .iter()
            .map(|n| self.get(n).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// 业务主键的可读形式，例如 "input_number=S001, line_number=2"
    pub fn key_display(&self, key_fields: &[&str]) -> String {
        key_fields
            .iter()
            .map(|k| match self.get(k) {
                Some(Value::Text(s)) => format!("{}={}", k, s),
                Some(Value::Integer(i)) => format!("{}={}", k, i),
                Some(Value::Real(r)) => format!("{}={}", k, r),
                _ => format!("{}=NULL", k),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
