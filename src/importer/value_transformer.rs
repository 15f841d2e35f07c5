// ==========================================
// 台账导入管道 - 值转换器
// ==========================================
// 职责: 原始单元格 → 标准化的日期/时间/小数/整数/文本
// 约束: 纯函数；空值/非法值一律返回 None，不报错
// 支持: Excel 日期序列号、全角数字、千分位、货币符号
// ==========================================

use crate::importer::tabular_reader::CellValue;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Excel 1900 日期系统的零点（已包含 1900-02-29 偏移修正）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// 9999-12-31 对应的序列号上限
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

pub const DB_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DB_DATETIME_MILLIS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

// ==========================================
// 全角 → 半角
// ==========================================

/// 全角 ASCII 区（！～）与全角空格转换为半角，其余字符原样保留
pub fn normalize_width(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            '\u{2212}' => '-',
            _ => c,
        })
        .collect()
}

/// 单元格是否为空白（空单元格或仅含空白字符的文本）
pub fn is_blank(cell: &CellValue) -> bool {
    match cell {
        CellValue::Empty => true,
        CellValue::Text(s) => s.chars().all(|c| c.is_whitespace()),
        _ => false,
    }
}

// ==========================================
// 文本
// ==========================================

/// 文本字段：TRIM + 空串转 NULL；数值单元格去掉多余的 ".0"
pub fn to_db_string(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Empty => None,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        CellValue::Int(i) => Some(i.to_string()),
        CellValue::Number(f) => format_plain_number(*f),
        CellValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        CellValue::DateTime(serial) => {
            serial_to_datetime(*serial).map(|dt| dt.format(DB_DATE_FORMAT).to_string())
        }
    }
}

/// 数值按普通文本输出（JAN 码被 Excel 识别为数字时不出现 ".0" 或科学计数法）
fn format_plain_number(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        Some(format!("{}", f as i64))
    } else {
        Some(format!("{}", f))
    }
}

// ==========================================
// 日期 / 时间
// ==========================================

/// Excel 序列号 → 日期时间（毫秒精度）
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial >= MAX_EXCEL_SERIAL {
        return None;
    }
    let days = serial.trunc() as i64;
    let millis = (serial.fract() * 86_400_000.0).round() as i64;
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

/// 日期字符串解析: YYYY/MM/DD, YYYY.MM.DD, YYYY-MM-DD, YYYYMMDD, YYYY年M月D日
fn parse_date_str(value: &str) -> Option<NaiveDate> {
    let normalized = normalize_width(value);
    let date_part = normalized
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?
        .replace(|c: char| matches!(c, '/' | '.' | '年' | '月'), "-")
        .replace('日', "");
    let date_part = date_part.trim_end_matches('-');

    if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();
    }

    let mut parts = date_part.split('-');
    let y: i32 = parts.next()?.trim().parse().ok()?;
    let m: u32 = parts.next()?.trim().parse().ok()?;
    let d: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() || !(1000..=9999).contains(&y) {
        return None;
    }
    NaiveDate::from_ymd_opt(y, m, d)
}

/// 时间字符串解析: HH:MM, HH:MM:SS, HH:MM:SS.fff（可带前置日期部分）
fn parse_time_str(value: &str) -> Option<NaiveTime> {
    let normalized = normalize_width(value);
    let time_part = normalized.split_whitespace().last()?;
    let time_part = time_part.rsplit('T').next().unwrap_or(time_part);

    if !time_part.contains(':') {
        // CSV 中导出的小数序列号（例如 "0.5" = 12:00）
        let f: f64 = time_part.parse().ok()?;
        return fraction_to_time(f);
    }

    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time_part, fmt).ok())
}

fn fraction_to_time(f: f64) -> Option<NaiveTime> {
    if !f.is_finite() || f < 0.0 {
        return None;
    }
    serial_to_datetime(f.fract()).map(|dt| dt.time())
}

/// 纯数字文本是否应视为序列号（最多 5 位整数部分，例如 "45748" / "45748.5"）
fn looks_like_serial(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let int_part = trimmed.split('.').next()?;
    if int_part.is_empty() || int_part.len() > 5 || !int_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// 单元格 → 日期时间（日期部分必需，时间部分缺省为 00:00:00）
fn cell_to_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::Int(i) if *i >= 1 => serial_to_datetime(*i as f64),
        CellValue::Number(f) | CellValue::DateTime(f) if *f >= 1.0 => serial_to_datetime(*f),
        CellValue::Text(s) => {
            let normalized = normalize_width(s);
            let trimmed = normalized.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Some(serial) = looks_like_serial(trimmed) {
                if serial >= 1.0 {
                    return serial_to_datetime(serial);
                }
                return None;
            }
            let date = parse_date_str(trimmed)?;
            let has_time_part = trimmed.contains(':');
            let time = if has_time_part {
                parse_time_str(trimmed).unwrap_or(NaiveTime::MIN)
            } else {
                NaiveTime::MIN
            };
            Some(date.and_time(time))
        }
        _ => None,
    }
}

/// 单元格 → ISO 日期字符串（YYYY-MM-DD）
pub fn to_db_date(cell: &CellValue) -> Option<String> {
    cell_to_datetime(cell).map(|dt| dt.date().format(DB_DATE_FORMAT).to_string())
}

/// 单元格 → 时间
pub fn to_db_time(cell: &CellValue) -> Option<NaiveTime> {
    match cell {
        CellValue::Number(f) | CellValue::DateTime(f) => fraction_to_time(*f),
        CellValue::Int(_) => Some(NaiveTime::MIN),
        CellValue::Text(s) if !s.trim().is_empty() => parse_time_str(s),
        _ => None,
    }
}

/// 日期 + 可选时间 → 组合时间戳
///
/// - 仅日期: 当天 00:00:00
/// - 日期单元格自带时间且时间列为空: 使用日期单元格中的时间
/// - 时间列有效: 使用时间列
/// - with_millis: 输出 "YYYY-MM-DD HH:MM:SS.fff"
pub fn to_db_datetime(
    date_cell: &CellValue,
    time_cell: Option<&CellValue>,
    with_millis: bool,
) -> Option<String> {
    let base = cell_to_datetime(date_cell)?;
    let time = time_cell
        .filter(|c| !is_blank(c))
        .and_then(to_db_time)
        .unwrap_or_else(|| base.time());

    let combined = base.date().and_time(time);
    let fmt = if with_millis {
        DB_DATETIME_MILLIS_FORMAT
    } else {
        DB_DATETIME_FORMAT
    };
    // 秒级格式下丢弃亚秒部分
    let combined = if with_millis {
        combined
    } else {
        combined.with_nanosecond(0).unwrap_or(combined)
    };
    Some(combined.format(fmt).to_string())
}

// ==========================================
// 数值
// ==========================================

/// 数值文本清洗: 全角→半角、去千分位/货币符号/空白；(123) 与 △123 视为负数
fn clean_numeric_text(value: &str) -> Option<String> {
    let normalized = normalize_width(value);
    let mut s: String = normalized
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '\u{FFE5}' | '$' | '円') && !c.is_whitespace())
        .collect();

    let mut negative = false;
    if s.starts_with('(') && s.ends_with(')') && s.len() > 2 {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    for marker in ['△', '▲'] {
        if let Some(rest) = s.strip_prefix(marker) {
            negative = true;
            s = rest.to_string();
        }
    }
    if s.is_empty() {
        return None;
    }
    if negative {
        if s.starts_with('-') {
            return None;
        }
        s.insert(0, '-');
    }
    Some(s)
}

/// 拆分十进制文本为 (负号, 整数位, 小数位)，非法格式返回 None
fn split_decimal(s: &str) -> Option<(bool, String, String)> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let mut parts = body.splitn(2, '.');
    let int_part = parts.next().unwrap_or("");
    let frac_part = parts.next().unwrap_or("");

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let int_part = int_part.trim_start_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    Some((negative, int_part.to_string(), frac_part.to_string()))
}

/// 十进制文本按位舍入（四舍五入，远离零方向）
fn round_decimal(negative: bool, int_part: &str, frac_part: &str, scale: usize) -> String {
    let mut digits: Vec<u8> = int_part.bytes().map(|b| b - b'0').collect();
    let mut frac: Vec<u8> = frac_part.bytes().map(|b| b - b'0').collect();
    let round_up = frac.len() > scale && frac[scale] >= 5;
    frac.resize(scale, 0);

    if round_up {
        let mut carry = true;
        for d in frac.iter_mut().rev().chain(digits.iter_mut().rev()) {
            if !carry {
                break;
            }
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
            }
        }
        if carry {
            digits.insert(0, 1);
        }
    }

    let int_str: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
    let frac_str: String = frac.iter().map(|d| char::from(b'0' + d)).collect();
    let is_zero = digits.iter().chain(frac.iter()).all(|d| *d == 0);

    let sign = if negative && !is_zero { "-" } else { "" };
    if scale == 0 {
        format!("{}{}", sign, int_str)
    } else {
        format!("{}{}.{}", sign, int_str, frac_str)
    }
}

/// 单元格 → 固定小数位的十进制文本（无千分位），用于价格/金额列
pub fn to_db_decimal(cell: &CellValue, scale: usize) -> Option<String> {
    let text = match cell {
        CellValue::Int(i) => i.to_string(),
        CellValue::Number(f) => {
            if !f.is_finite() {
                return None;
            }
            format!("{}", f)
        }
        CellValue::Text(s) => clean_numeric_text(s)?,
        _ => return None,
    };

    match split_decimal(&text) {
        Some((negative, int_part, frac_part)) => {
            Some(round_decimal(negative, &int_part, &frac_part, scale))
        }
        None => {
            // 科学计数法等：退回浮点解析
            let f: f64 = text.parse().ok().filter(|f: &f64| f.is_finite())?;
            let plain = format!("{}", f);
            let (negative, int_part, frac_part) = split_decimal(&plain)?;
            Some(round_decimal(negative, &int_part, &frac_part, scale))
        }
    }
}

/// 单元格 → 整数；"1.00" 视为 1，"1.5" 视为非法
pub fn to_db_integer(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Int(i) => Some(*i),
        CellValue::Number(f) => {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                Some(*f as i64)
            } else {
                None
            }
        }
        CellValue::Text(s) => {
            let cleaned = clean_numeric_text(s)?;
            let (negative, int_part, frac_part) = split_decimal(&cleaned)?;
            if frac_part.chars().any(|c| c != '0') {
                return None;
            }
            let value: i64 = int_part.parse().ok()?;
            Some(if negative { -value } else { value })
        }
        _ => None,
    }
}
