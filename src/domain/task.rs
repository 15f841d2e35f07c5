// ==========================================
// 台账导入管道 - 导入任务领域模型
// ==========================================
// 对齐: sql/schema.sql import_tasks 表
// 生产者: 上游上传处理（插入 status='pending' 行）
// 消费者: scheduler::TaskRunner（唯一的状态推进者）
// ==========================================

use crate::domain::types::{TargetData, TaskStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// ImportTask - 导入任务
// ==========================================
// 时间字段沿用表内文本格式（YYYY-MM-DD HH:MM:SS），由上游写入，不强制解析
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTask {
    pub id: i64,
    pub status: TaskStatus,
    pub target_data_name: String,
    pub original_file_name: String,
    pub stored_file_path: String,
    pub uploaded_at: String,
    pub uploaded_by: Option<String>,
    pub processing_started_at: Option<String>,
    pub processing_finished_at: Option<String>,
    pub result_message: Option<String>,
}

impl ImportTask {
    /// 解析导入目标（未知判别值返回 None）
    pub fn target(&self) -> Option<TargetData> {
        TargetData::parse(&self.target_data_name)
    }
}

// ==========================================
// NewImportTask - 入队参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImportTask {
    pub target_data_name: String,
    pub original_file_name: String,
    pub stored_file_path: String,
    pub uploaded_by: Option<String>,
}
