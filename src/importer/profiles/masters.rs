// ==========================================
// 台账导入管道 - 主数据布局
// ==========================================
// 表头行: 第 1 行
// 更新方式: 批量（与插入一样按阈值提交）
// ==========================================

use crate::domain::TargetData;
use crate::importer::entity_profile::{EntityProfile, FieldSpec, UpdateMode};

// ===== 商品主数据 → products =====

const PRODUCT_HEADER: &[&str] = &[
    "JAN编码",
    "商品编码",
    "商品名称",
    "商品名称(假名)",
    "厂商编码",
    "品牌名称",
    "颜色编码",
    "颜色名称",
    "尺码",
    "类别编码",
    "定价",
    "成本价",
    "税率",
    "入数",
    "上市日期",
    "停售日期",
    "", // 备注列，各门店叫法不一
];

const PRODUCT_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("jan_code", 0).required(),
    FieldSpec::text("product_code", 1),
    FieldSpec::text("product_name", 2).required(),
    FieldSpec::text("product_name_kana", 3),
    FieldSpec::text("manufacturer_code", 4),
    FieldSpec::text("brand_name", 5),
    FieldSpec::text("color_code", 6),
    FieldSpec::text_or("color_name", 7, 6),
    FieldSpec::text("size_name", 8),
    FieldSpec::text("category_code", 9),
    FieldSpec::decimal("list_price", 10),
    FieldSpec::decimal("cost_price", 11),
    FieldSpec::decimal("tax_rate", 12),
    FieldSpec::integer("case_quantity", 13),
    FieldSpec::date("release_date", 14),
    FieldSpec::date("discontinued_date", 15),
    FieldSpec::text("remarks", 16),
];

pub static PRODUCT_MASTER: EntityProfile = EntityProfile {
    target: TargetData::ProductMaster,
    table: "products",
    expected_header: PRODUCT_HEADER,
    header_row: 1,
    max_columns: 17,
    fields: PRODUCT_FIELDS,
    key_fields: &["jan_code"],
    update_mode: UpdateMode::Batched,
};

// ===== 厂商主数据 → manufacturers =====

const MANUFACTURER_HEADER: &[&str] = &[
    "厂商编码",
    "厂商名称",
    "厂商名称(假名)",
    "邮政编码",
    "地址",
    "电话号码",
    "传真号码",
    "负责人",
    "交易开始日",
    "",
];

const MANUFACTURER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("manufacturer_code", 0).required(),
    FieldSpec::text("manufacturer_name", 1).required(),
    FieldSpec::text("manufacturer_name_kana", 2),
    FieldSpec::text("postal_code", 3),
    FieldSpec::text("address", 4),
    FieldSpec::text("phone_number", 5),
    FieldSpec::text("fax_number", 6),
    FieldSpec::text("contact_person", 7),
    FieldSpec::date("trade_start_date", 8),
    FieldSpec::text("remarks", 9),
];

pub static MANUFACTURER_MASTER: EntityProfile = EntityProfile {
    target: TargetData::ManufacturerMaster,
    table: "manufacturers",
    expected_header: MANUFACTURER_HEADER,
    header_row: 1,
    max_columns: 10,
    fields: MANUFACTURER_FIELDS,
    key_fields: &["manufacturer_code"],
    update_mode: UpdateMode::Batched,
};
