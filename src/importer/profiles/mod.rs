// ==========================================
// 台账导入管道 - 实体布局注册
// ==========================================

mod masters;
mod slips;

pub use masters::{MANUFACTURER_MASTER, PRODUCT_MASTER};
pub use slips::{ORDER_SLIP, PURCHASE_SLIP, SALES_SLIP, TRANSFER_SLIP};

use crate::domain::TargetData;
use crate::importer::entity_profile::EntityProfile;

/// 导入目标 → 实体布局
pub fn profile_for(target: TargetData) -> &'static EntityProfile {
    match target {
        TargetData::ProductMaster => &PRODUCT_MASTER,
        TargetData::ManufacturerMaster => &MANUFACTURER_MASTER,
        TargetData::PurchaseSlip => &PURCHASE_SLIP,
        TargetData::SalesSlip => &SALES_SLIP,
        TargetData::TransferSlip => &TRANSFER_SLIP,
        TargetData::OrderSlip => &ORDER_SLIP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::entity_profile::UpdateMode;

    #[test]
    fn test_profiles_are_consistent() {
        for target in TargetData::ALL {
            let profile = profile_for(target);
            assert_eq!(profile.target, target);
            assert_eq!(profile.expected_header.len(), profile.max_columns);
            assert_eq!(profile.header_row, if target.is_slip() { 2 } else { 1 });
            assert_eq!(
                profile.update_mode,
                if target.is_slip() {
                    UpdateMode::Immediate
                } else {
                    UpdateMode::Batched
                }
            );

            let names = profile.field_names();
            for key in profile.key_fields {
                assert!(names.contains(key), "{} 缺少主键字段 {}", profile.table, key);
            }
            for spec in profile.fields {
                assert!(spec.source.primary_column() < profile.max_columns);
            }
        }
    }
}
