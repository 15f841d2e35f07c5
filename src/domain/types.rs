// ==========================================
// 台账导入管道 - 领域类型定义
// ==========================================
// 职责: 导入目标、任务状态、归档状态标签
// 序列化格式: snake_case (与 import_tasks 表/归档目录一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入目标 (Target Data)
// ==========================================
// 对应 import_tasks.target_data_name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetData {
    ProductMaster,      // 商品主数据
    ManufacturerMaster, // 厂商主数据
    PurchaseSlip,       // 进货传票
    SalesSlip,          // 销售传票
    TransferSlip,       // 调拨传票
    OrderSlip,          // 订货/调整传票
}

impl TargetData {
    pub const ALL: [TargetData; 6] = [
        TargetData::ProductMaster,
        TargetData::ManufacturerMaster,
        TargetData::PurchaseSlip,
        TargetData::SalesSlip,
        TargetData::TransferSlip,
        TargetData::OrderSlip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetData::ProductMaster => "product_master",
            TargetData::ManufacturerMaster => "manufacturer_master",
            TargetData::PurchaseSlip => "purchase_slip",
            TargetData::SalesSlip => "sales_slip",
            TargetData::TransferSlip => "transfer_slip",
            TargetData::OrderSlip => "order_slip",
        }
    }

    /// 从判别字符串解析（未知值返回 None，由调度器生成失败结果）
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
    }

    pub fn is_slip(&self) -> bool {
        !matches!(self, TargetData::ProductMaster | TargetData::ManufacturerMaster)
    }
}

impl fmt::Display for TargetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 任务状态 (Task Status)
// ==========================================
// 生命周期: pending → processing → success / failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Success => "success",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "success" => Some(TaskStatus::Success),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 归档状态标签 (Archive Status)
// ==========================================
// 用途: 选择归档子目录 + result_message 前缀
// 映射: PerfectSuccess / CompletedWithIssues → success，其余 → failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    PerfectSuccess,          // 全部成功，无跳过
    CompletedWithIssues,     // 跑完全文件，但存在跳过/错误
    ImportFailed,            // 文件级失败或无任何行写入
    ServiceReturnError,      // 未知目标/服务无法执行
    TaskProcessingException, // 服务执行中发生 panic
    UnknownProcessingError,  // 强制终止（信号/崩溃钩子）
}

impl ArchiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveStatus::PerfectSuccess => "perfect_success",
            ArchiveStatus::CompletedWithIssues => "completed_with_issues",
            ArchiveStatus::ImportFailed => "import_failed",
            ArchiveStatus::ServiceReturnError => "service_return_error",
            ArchiveStatus::TaskProcessingException => "task_processing_exception",
            ArchiveStatus::UnknownProcessingError => "unknown_processing_error",
        }
    }

    /// 落库时使用的粗粒度任务状态
    pub fn task_status(&self) -> TaskStatus {
        match self {
            ArchiveStatus::PerfectSuccess | ArchiveStatus::CompletedWithIssues => {
                TaskStatus::Success
            }
            _ => TaskStatus::Failed,
        }
    }
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_data_parse() {
        assert_eq!(
            TargetData::parse("product_master"),
            Some(TargetData::ProductMaster)
        );
        assert_eq!(
            TargetData::parse("  Sales_Slip "),
            Some(TargetData::SalesSlip)
        );
        assert_eq!(TargetData::parse("stock_master"), None);
        assert!(TargetData::OrderSlip.is_slip());
        assert!(!TargetData::ManufacturerMaster.is_slip());
    }

    #[test]
    fn test_archive_status_maps_to_task_status() {
        assert_eq!(ArchiveStatus::PerfectSuccess.task_status(), TaskStatus::Success);
        assert_eq!(
            ArchiveStatus::CompletedWithIssues.task_status(),
            TaskStatus::Success
        );
        assert_eq!(ArchiveStatus::ImportFailed.task_status(), TaskStatus::Failed);
        assert_eq!(
            ArchiveStatus::TaskProcessingException.task_status(),
            TaskStatus::Failed
        );
    }

    #[test]
    fn test_task_status_roundtrip_str() {
        for s in ["pending", "processing", "success", "failed"] {
            assert_eq!(TaskStatus::from_str(s).map(|v| v.as_str()), Some(s));
        }
        assert_eq!(TaskStatus::from_str("perfect_success"), None);
    }
}
