// ==========================================
// 台账导入管道 - 表格读取适配器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls/.xlsb/.ods) / CSV (.csv) / TSV (.tsv/.txt)
// 形态: 只进行游标，逐行产出无类型单元格
// 读取过滤: 起始行之前的行不物化，超出最大列数的单元格直接丢弃
// ==========================================

use crate::importer::error::{ImportError, ImporterResult};
use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use std::fs::File;
use std::path::Path;

// ==========================================
// 单元格与行
// ==========================================

/// 原始单元格值（未经转换）
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    /// Excel 日期时间序列号
    DateTime(f64),
}

impl CellValue {
    /// 表头比较等场景使用的文本形式
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Number(f) => f.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::DateTime(f) => f.to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            // 单元格错误值（#N/A 等）视为空
            Data::Error(_) => CellValue::Empty,
        }
    }
}

/// 源文件中的一行（row_number 为 1 起的物理行号）
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub row_number: usize,
    pub cells: Vec<CellValue>,
}

impl RawRow {
    /// 取指定列（越界视为空单元格）
    pub fn cell(&self, index: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.cells.get(index).unwrap_or(EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .all(crate::importer::value_transformer::is_blank)
    }
}

/// 读取过滤器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFilter {
    /// 从第几行开始物化（1 起）
    pub first_row: usize,
    /// 每行最多物化的列数
    pub max_columns: usize,
}

impl ReadFilter {
    pub fn new(first_row: usize, max_columns: usize) -> Self {
        Self {
            first_row: first_row.max(1),
            max_columns,
        }
    }
}

/// 只进行游标
pub type RowCursor = Box<dyn Iterator<Item = ImporterResult<RawRow>>>;

// ==========================================
// TabularReader Trait
// ==========================================
// 用途: 打开文件并返回行游标
// 实现者: UniversalTabularReader（按扩展名分派）
pub trait TabularReader: Send + Sync {
    fn open(&self, file_path: &Path, filter: ReadFilter) -> ImporterResult<RowCursor>;
}

// ==========================================
// CSV 游标（真正的流式读取）
// ==========================================
struct CsvRowCursor {
    records: StringRecordsIntoIter<File>,
    filter: ReadFilter,
    /// 上一条记录的物理行号；csv 会跳过空行，行号以记录起始行为准
    row_number: usize,
}

impl Iterator for CsvRowCursor {
    type Item = ImporterResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(ImportError::from(e))),
            };
            self.row_number = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(self.row_number + 1);

            if self.row_number < self.filter.first_row {
                continue;
            }

            let cells = record
                .iter()
                .take(self.filter.max_columns)
                .enumerate()
                .map(|(idx, value)| {
                    // 第一行第一个单元格去掉 UTF-8 BOM
                    let value = if self.row_number == 1 && idx == 0 {
                        value.trim_start_matches('\u{FEFF}')
                    } else {
                        value
                    };
                    if value.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(value.to_string())
                    }
                })
                .collect();

            return Some(Ok(RawRow {
                row_number: self.row_number,
                cells,
            }));
        }
    }
}

pub struct CsvReader {
    pub delimiter: u8,
}

impl TabularReader for CsvReader {
    fn open(&self, file_path: &Path, filter: ReadFilter) -> ImporterResult<RowCursor> {
        let file = File::open(file_path)?;
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(self.delimiter)
            .from_reader(file);

        Ok(Box::new(CsvRowCursor {
            records: reader.into_records(),
            filter,
            row_number: 0,
        }))
    }
}

// ==========================================
// Excel 游标（按行惰性转换）
// ==========================================
struct SheetRowCursor {
    range: Range<Data>,
    filter: ReadFilter,
    /// 下一个要产出的物理行号（1 起）
    next_row: usize,
    /// 使用区域左上角的物理坐标（0 起）
    origin: (usize, usize),
    /// 使用区域最后一行的物理行号（1 起）
    last_row: usize,
}

impl SheetRowCursor {
    fn new(range: Range<Data>, filter: ReadFilter) -> Self {
        let origin = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let last_row = if range.is_empty() {
            0
        } else {
            origin.0 + range.height()
        };
        Self {
            range,
            filter,
            next_row: filter.first_row,
            origin,
            last_row,
        }
    }
}

impl Iterator for SheetRowCursor {
    type Item = ImporterResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.last_row {
            return None;
        }
        let row_number = self.next_row;
        self.next_row += 1;

        let physical_row = row_number - 1;
        let cells = (0..self.filter.max_columns)
            .map(|col| {
                if physical_row < self.origin.0 || col < self.origin.1 {
                    return CellValue::Empty;
                }
                self.range
                    .get((physical_row - self.origin.0, col - self.origin.1))
                    .map(CellValue::from)
                    .unwrap_or(CellValue::Empty)
            })
            .collect();

        Some(Ok(RawRow { row_number, cells }))
    }
}

pub struct SpreadsheetReader;

impl TabularReader for SpreadsheetReader {
    fn open(&self, file_path: &Path, filter: ReadFilter) -> ImporterResult<RowCursor> {
        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        Ok(Box::new(SheetRowCursor::new(range, filter)))
    }
}

// ==========================================
// 通用读取器（根据扩展名自动选择）
// ==========================================
pub struct UniversalTabularReader;

impl TabularReader for UniversalTabularReader {
    fn open(&self, file_path: &Path, filter: ReadFilter) -> ImporterResult<RowCursor> {
        if !file_path.exists() {
            return Err(ImportError::FileNotFound(file_path.display().to_string()));
        }

        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvReader { delimiter: b',' }.open(file_path, filter),
            "tsv" | "txt" => CsvReader { delimiter: b'\t' }.open(file_path, filter),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => SpreadsheetReader.open(file_path, filter),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}
