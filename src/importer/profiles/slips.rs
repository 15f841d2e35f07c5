// ==========================================
// 台账导入管道 - 传票布局
// ==========================================
// 表头行: 第 2 行（第 1 行为自由标题）
// 业务主键: (input_number, line_number)
// 更新方式: 命中即单行更新；插入仍按批次
// ==========================================

use crate::domain::TargetData;
use crate::importer::entity_profile::{EntityProfile, FieldSpec, UpdateMode};

const SLIP_KEY: &[&str] = &["input_number", "line_number"];

// ===== 进货传票 =====

const PURCHASE_HEADER: &[&str] = &[
    "输入编号",
    "行号",
    "进货日期",
    "进货时间",
    "供应商编码",
    "仓库编码",
    "JAN编码",
    "商品名称",
    "颜色编码",
    "颜色名称",
    "尺码",
    "数量",
    "进货单价",
    "进货金额",
    "税额",
    "",
];

const PURCHASE_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("input_number", 0).required(),
    FieldSpec::integer("line_number", 1).required(),
    FieldSpec::date("slip_date", 2).required(),
    FieldSpec::timestamp("purchased_at", 2, 3, true),
    FieldSpec::text("supplier_code", 4),
    FieldSpec::text("warehouse_code", 5),
    FieldSpec::text("jan_code", 6).required(),
    FieldSpec::text("product_name", 7),
    FieldSpec::text("color_code", 8),
    FieldSpec::text_or("color_name", 9, 8),
    FieldSpec::text("size_name", 10),
    FieldSpec::integer("quantity", 11).required(),
    FieldSpec::decimal("unit_cost", 12),
    FieldSpec::decimal("amount", 13),
    FieldSpec::decimal("tax_amount", 14),
    FieldSpec::text("remarks", 15),
];

pub static PURCHASE_SLIP: EntityProfile = EntityProfile {
    target: TargetData::PurchaseSlip,
    table: "purchase_slip",
    expected_header: PURCHASE_HEADER,
    header_row: 2,
    max_columns: 16,
    fields: PURCHASE_FIELDS,
    key_fields: SLIP_KEY,
    update_mode: UpdateMode::Immediate,
};

// ===== 销售传票 =====

const SALES_HEADER: &[&str] = &[
    "输入编号",
    "行号",
    "销售日期",
    "销售时间",
    "店铺编码",
    "收银机编号",
    "JAN编码",
    "商品名称",
    "颜色编码",
    "颜色名称",
    "尺码",
    "数量",
    "销售单价",
    "折扣金额",
    "销售金额",
    "税额",
    "会员编号",
];

const SALES_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("input_number", 0).required(),
    FieldSpec::integer("line_number", 1).required(),
    FieldSpec::date("slip_date", 2).required(),
    FieldSpec::timestamp("sold_at", 2, 3, true),
    FieldSpec::text("store_code", 4),
    FieldSpec::text("register_number", 5),
    FieldSpec::text("jan_code", 6).required(),
    FieldSpec::text("product_name", 7),
    FieldSpec::text("color_code", 8),
    FieldSpec::text_or("color_name", 9, 8),
    FieldSpec::text("size_name", 10),
    FieldSpec::integer("quantity", 11).required(),
    FieldSpec::decimal("unit_price", 12),
    FieldSpec::decimal("discount_amount", 13),
    FieldSpec::decimal("amount", 14),
    FieldSpec::decimal("tax_amount", 15),
    FieldSpec::text("member_code", 16),
];

pub static SALES_SLIP: EntityProfile = EntityProfile {
    target: TargetData::SalesSlip,
    table: "sales_slip",
    expected_header: SALES_HEADER,
    header_row: 2,
    max_columns: 17,
    fields: SALES_FIELDS,
    key_fields: SLIP_KEY,
    update_mode: UpdateMode::Immediate,
};

// ===== 调拨传票 =====

const TRANSFER_HEADER: &[&str] = &[
    "输入编号",
    "行号",
    "调拨日期",
    "调拨时间",
    "调出仓库",
    "调入仓库",
    "JAN编码",
    "商品名称",
    "颜色编码",
    "颜色名称",
    "尺码",
    "数量",
    "单价",
    "金额",
    "",
];

const TRANSFER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("input_number", 0).required(),
    FieldSpec::integer("line_number", 1).required(),
    FieldSpec::date("slip_date", 2).required(),
    FieldSpec::timestamp("transferred_at", 2, 3, true),
    FieldSpec::text("from_warehouse_code", 4).required(),
    FieldSpec::text("to_warehouse_code", 5).required(),
    FieldSpec::text("jan_code", 6).required(),
    FieldSpec::text("product_name", 7),
    FieldSpec::text("color_code", 8),
    FieldSpec::text_or("color_name", 9, 8),
    FieldSpec::text("size_name", 10),
    FieldSpec::integer("quantity", 11).required(),
    FieldSpec::decimal("unit_cost", 12),
    FieldSpec::decimal("amount", 13),
    FieldSpec::text("remarks", 14),
];

pub static TRANSFER_SLIP: EntityProfile = EntityProfile {
    target: TargetData::TransferSlip,
    table: "transfer_slip",
    expected_header: TRANSFER_HEADER,
    header_row: 2,
    max_columns: 15,
    fields: TRANSFER_FIELDS,
    key_fields: SLIP_KEY,
    update_mode: UpdateMode::Immediate,
};

// ===== 订货/调整传票 =====

const ORDER_HEADER: &[&str] = &[
    "输入编号",
    "行号",
    "订货日期",
    "订货时间",
    "调整区分",
    "供应商编码",
    "交货预定日",
    "JAN编码",
    "商品名称",
    "颜色编码",
    "颜色名称",
    "尺码",
    "数量",
    "单价",
    "金额",
    "",
];

const ORDER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("input_number", 0).required(),
    FieldSpec::integer("line_number", 1).required(),
    FieldSpec::date("slip_date", 2).required(),
    // 订货时间只到秒
    FieldSpec::timestamp("ordered_at", 2, 3, false),
    FieldSpec::text("adjustment_type", 4),
    FieldSpec::text("supplier_code", 5),
    FieldSpec::date("delivery_due_date", 6),
    FieldSpec::text("jan_code", 7).required(),
    FieldSpec::text("product_name", 8),
    FieldSpec::text("color_code", 9),
    FieldSpec::text_or("color_name", 10, 9),
    FieldSpec::text("size_name", 11),
    FieldSpec::integer("quantity", 12).required(),
    FieldSpec::decimal("unit_cost", 13),
    FieldSpec::decimal("amount", 14),
    FieldSpec::text("remarks", 15),
];

pub static ORDER_SLIP: EntityProfile = EntityProfile {
    target: TargetData::OrderSlip,
    table: "order_slip",
    expected_header: ORDER_HEADER,
    header_row: 2,
    max_columns: 16,
    fields: ORDER_FIELDS,
    key_fields: SLIP_KEY,
    update_mode: UpdateMode::Immediate,
};
