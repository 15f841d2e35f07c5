// ==========================================
// BatchImportEngine 集成测试
// ==========================================
// 测试目标: 批次阈值、行级跳过、表头中止、插入/更新路由、批次回滚
// ==========================================


use ledger_import::domain::{ArchiveStatus, TargetData};
use ledger_import::importer::profiles::{PRODUCT_MASTER, PURCHASE_SLIP};
use ledger_import::importer::BatchImportEngine;
use ledger_import::logging;
use ledger_import::repository::EntityRecordRepositoryImpl;
use ledger_import::scheduler::classify;
use std::io::Write;
use test_helpers::*;

fn engine(db_path: &str, batch_size: usize) -> BatchImportEngine<EntityRecordRepositoryImpl> {
    BatchImportEngine::new(
        EntityRecordRepositoryImpl::new(open_shared(db_path)),
        settings(batch_size),
    )
}

#[test]
fn test_flush_count_follows_batch_threshold() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let rows: Vec<Vec<&str>> = ["4900000000001", "4900000000002", "4900000000003", "4900000000004", "4900000000005"]
        .iter()
        .map(|jan| product_row(jan, "商品", "1,200"))
        .collect();
    let file = write_csv(dir.path(), "products.csv", TargetData::ProductMaster, &rows);

    let result = engine(&db_path, 2).import_file(&PRODUCT_MASTER, &file);

    assert!(result.success, "{:?}", result.error_messages);
    assert!(result.completed);
    assert_eq!(result.processed_rows, 5);
    assert_eq!(result.imported_count, 5);
    // ceil(5 / 2)
    assert_eq!(result.insert_flushes, 3);
    assert_eq!(result.update_flushes, 0);
    assert_eq!(classify(&result), ArchiveStatus::PerfectSuccess);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, "products"), 5);
    assert_eq!(
        query_text(&conn, "SELECT list_price FROM products WHERE jan_code = '4900000000003'"),
        Some("1200.00".to_string())
    );
    // 颜色名称为空时退回颜色编码
    assert_eq!(
        query_text(&conn, "SELECT color_name FROM products WHERE jan_code = '4900000000001'"),
        Some("RD".to_string())
    );
}

#[test]
fn test_blank_rows_are_not_counted_and_missing_required_is_skipped() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(
        dir.path(),
        "products.csv",
        TargetData::ProductMaster,
        &[
            product_row("4900000000001", "商品A", "100"),
            product_row("4900000000002", "", "100"),
            vec!["", "", ""],
            product_row("4900000000003", "商品C", "abc"),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PRODUCT_MASTER, &file);

    assert!(result.completed);
    assert!(!result.success);
    assert_eq!(result.processed_rows, 3);
    assert_eq!(result.imported_count, 2);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.error_messages, vec!["第 3 行: 必填字段缺失 [商品名称]".to_string()]);
    assert_eq!(classify(&result), ArchiveStatus::CompletedWithIssues);

    // 非法单价只置空，不跳过
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(
        query_text(&conn, "SELECT list_price FROM products WHERE jan_code = '4900000000003'"),
        None
    );
}

#[test]
fn test_header_mismatch_aborts_without_writes() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_raw_csv(
        dir.path(),
        "products.csv",
        &[
            vec!["JAN编码", "商品编码", "品名"],
            product_row("4900000000001", "商品A", "100"),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PRODUCT_MASTER, &file);

    assert!(!result.completed);
    assert!(!result.success);
    assert_eq!(result.processed_rows, 0);
    assert!(result.message.contains("第 3 列"), "{}", result.message);
    assert_eq!(classify(&result), ArchiveStatus::ImportFailed);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, "products"), 0);
}

#[test]
fn test_master_existing_keys_use_batched_update() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&db_path, 10);

    let first = write_csv(
        dir.path(),
        "first.csv",
        TargetData::ProductMaster,
        &[
            product_row("4900000000001", "旧名A", "100"),
            product_row("4900000000002", "旧名B", "200"),
        ],
    );
    assert!(engine.import_file(&PRODUCT_MASTER, &first).success);

    let second = write_csv(
        dir.path(),
        "second.csv",
        TargetData::ProductMaster,
        &[
            product_row("4900000000001", "新名A", "110"),
            product_row("4900000000002", "新名B", "210"),
            product_row("4900000000009", "新品", "300"),
        ],
    );
    let result = engine.import_file(&PRODUCT_MASTER, &second);

    assert!(result.success, "{:?}", result.error_messages);
    assert_eq!(result.imported_count, 1);
    assert_eq!(result.updated_count, 2);
    assert_eq!(result.update_flushes, 1);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, "products"), 3);
    assert_eq!(
        query_text(&conn, "SELECT product_name FROM products WHERE jan_code = '4900000000002'"),
        Some("新名B".to_string())
    );
}

#[test]
fn test_slip_existing_keys_update_immediately() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&db_path, 10);

    let first = write_csv(
        dir.path(),
        "first.csv",
        TargetData::PurchaseSlip,
        &[purchase_row("IN-1", "1", "4900000000001", "5")],
    );
    assert!(engine.import_file(&PURCHASE_SLIP, &first).success);

    let second = write_csv(
        dir.path(),
        "second.csv",
        TargetData::PurchaseSlip,
        &[
            purchase_row("IN-1", "1", "4900000000001", "8"),
            purchase_row("IN-1", "2", "4900000000002", "3"),
        ],
    );
    let result = engine.import_file(&PURCHASE_SLIP, &second);

    assert!(result.success, "{:?}", result.error_messages);
    assert_eq!(result.updated_count, 1);
    assert_eq!(result.imported_count, 1);
    assert_eq!(result.update_flushes, 0);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let qty: i64 = conn
        .query_row(
            "SELECT quantity FROM purchase_slip WHERE input_number = 'IN-1' AND line_number = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(qty, 8);
}

#[test]
fn test_failed_batch_rolls_back_only_that_batch() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_product BEFORE INSERT ON products
             WHEN NEW.jan_code = '4900000000003'
             BEGIN SELECT RAISE(ABORT, 'rejected by trigger'); END;",
        )
        .unwrap();
    }

    let rows: Vec<Vec<&str>> = ["4900000000001", "4900000000002", "4900000000003", "4900000000004", "4900000000005"]
        .iter()
        .map(|jan| product_row(jan, "商品", "10"))
        .collect();
    let file = write_csv(dir.path(), "products.csv", TargetData::ProductMaster, &rows);

    let result = engine(&db_path, 2).import_file(&PRODUCT_MASTER, &file);

    assert!(result.completed);
    assert_eq!(result.imported_count, 3);
    assert_eq!(result.skipped_count, 2);
    assert_eq!(result.insert_flushes, 3);
    assert_eq!(result.error_messages.len(), 1);
    assert!(
        result.error_messages[0].starts_with("第 4-5 行 批次插入失败，已回滚 2 行"),
        "{}",
        result.error_messages[0]
    );
    assert_eq!(classify(&result), ArchiveStatus::CompletedWithIssues);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, "products"), 3);
    assert_eq!(
        query_text(&conn, "SELECT jan_code FROM products WHERE jan_code = '4900000000004'"),
        None
    );
}

#[test]
fn test_duplicate_key_within_batch_is_ignored() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(
        dir.path(),
        "products.csv",
        TargetData::ProductMaster,
        &[
            product_row("4900000000001", "第一次", "10"),
            product_row("4900000000001", "第二次", "20"),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PRODUCT_MASTER, &file);

    assert_eq!(result.imported_count, 1);
    assert_eq!(result.skipped_count, 1);
    assert!(result.error_messages[0].contains("因业务主键重复被忽略"));

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(
        query_text(&conn, "SELECT product_name FROM products"),
        Some("第一次".to_string())
    );
}

#[test]
fn test_slip_duplicate_in_pending_batch_keeps_first_row() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(
        dir.path(),
        "purchase.csv",
        TargetData::PurchaseSlip,
        &[
            purchase_row("IN-7", "1", "4900000000001", "3"),
            purchase_row("IN-7", "1", "4900000000001", "9"),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PURCHASE_SLIP, &file);

    assert_eq!(result.imported_count, 1);
    assert_eq!(result.updated_count, 0);
    assert_eq!(result.skipped_count, 1);
    assert!(result.error_messages[0].contains("第 3-4 行"), "{:?}", result.error_messages);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let quantity: i64 = conn
        .query_row("SELECT quantity FROM purchase_slip WHERE input_number = 'IN-7'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(quantity, 3);
}

#[test]
fn test_read_error_keeps_committed_rows_but_fails_file() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_csv(
        dir.path(),
        "products.csv",
        TargetData::ProductMaster,
        &[product_row("4900000000001", "商品A", "10")],
    );
    {
        let mut f = std::fs::OpenOptions::new().append(true).open(&file).unwrap();
        f.write_all(b"4900000000002,P-2,\xff\xfe,bad\n").unwrap();
    }

    let result = engine(&db_path, 200).import_file(&PRODUCT_MASTER, &file);

    assert!(!result.completed);
    assert!(!result.success);
    assert_eq!(result.imported_count, 1);
    assert!(result.message.starts_with("文件读取中断"), "{}", result.message);
    assert_eq!(classify(&result), ArchiveStatus::ImportFailed);

    let conn = rusqlite::Connection::open(&db_path).unwrap();
    assert_eq!(count_rows(&conn, "products"), 1);
}

/// 单行 CSV 文本（含逗号的字段会加引号）
fn csv_line(fields: &[&str]) -> String {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields).unwrap();
    let bytes = writer.into_inner().unwrap();
    String::from_utf8(bytes).unwrap().trim_end().to_string()
}

/// 以原始文本写入（保留真正的空行）
fn write_lines(dir: &std::path::Path, name: &str, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

#[test]
fn test_diagnostics_use_physical_line_numbers_after_empty_line() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_lines(
        dir.path(),
        "products.csv",
        &[
            csv_line(PRODUCT_MASTER.expected_header),
            csv_line(&product_row("4900000000001", "商品A", "100")),
            String::new(),
            csv_line(&product_row("4900000000002", "", "100")),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PRODUCT_MASTER, &file);

    assert!(result.completed);
    assert_eq!(result.processed_rows, 2);
    assert_eq!(result.imported_count, 1);
    assert_eq!(result.error_messages, vec!["第 4 行: 必填字段缺失 [商品名称]".to_string()]);
}

#[test]
fn test_slip_with_empty_title_line_keeps_header_on_row_two() {
    logging::init_test();
    let (_db, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let file = write_lines(
        dir.path(),
        "purchase.csv",
        &[
            String::new(),
            csv_line(PURCHASE_SLIP.expected_header),
            csv_line(&purchase_row("IN-1", "1", "4900000000001", "5")),
        ],
    );

    let result = engine(&db_path, 200).import_file(&PURCHASE_SLIP, &file);

    assert!(result.success, "{} {:?}", result.message, result.error_messages);
    assert_eq!(result.imported_count, 1);
}
