// ==========================================
// 台账导入管道 - SQL 构建工具模块
// ==========================================
// 职责: 由静态字段列表拼装 INSERT / UPDATE / EXISTS 语句
// 约束: 表名与列名只来自编译期常量（实体布局），值一律走参数绑定
// ==========================================

/// 构建 `?1, ?2, ...` 占位符列表
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 构建 `a = ?n AND b = ?n+1` 形式的条件
fn key_predicate(key_columns: &[&str], start: usize) -> String {
    key_columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", col, start + i))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// 构建 INSERT OR IGNORE 语句
///
/// 业务主键冲突的行被忽略（影响行数为 0），由调用方计为跳过。
///
/// # 示例
/// ```
/// use ledger_import::repository::sql_builder::build_insert_or_ignore_sql;
///
/// let sql = build_insert_or_ignore_sql("products", &["jan_code", "product_name"]);
/// assert_eq!(
///     sql,
///     "INSERT OR IGNORE INTO products (jan_code, product_name) VALUES (?1, ?2)"
/// );
/// ```
pub fn build_insert_or_ignore_sql(table: &str, columns: &[&str]) -> String {
    format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders(1, columns.len())
    )
}

/// 构建按业务主键更新的语句
///
/// # 参数
/// - `set_columns`: SET 子句中的列（绑定序号从 1 开始）
/// - `key_columns`: WHERE 子句中的主键列（绑定序号接在 SET 列之后）
///
/// # 示例
/// ```
/// use ledger_import::repository::sql_builder::build_update_by_key_sql;
///
/// let sql = build_update_by_key_sql("sales_slip", &["quantity", "updated_at"], &["input_number", "line_number"]);
/// assert_eq!(
///     sql,
///     "UPDATE sales_slip SET quantity = ?1, updated_at = ?2 WHERE input_number = ?3 AND line_number = ?4"
/// );
/// ```
pub fn build_update_by_key_sql(table: &str, set_columns: &[&str], key_columns: &[&str]) -> String {
    let set_clause = set_columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ?{}", col, i + 1))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE {} SET {} WHERE {}",
        table,
        set_clause,
        key_predicate(key_columns, set_columns.len() + 1)
    )
}

/// 构建按业务主键判断存在性的查询
pub fn build_exists_sql(table: &str, key_columns: &[&str]) -> String {
    format!(
        "SELECT 1 FROM {} WHERE {} LIMIT 1",
        table,
        key_predicate(key_columns, 1)
    )
}
