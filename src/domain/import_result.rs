// ==========================================
// 台账导入管道 - 导入结果
// ==========================================
// 用途: 每个实体导入服务返回给调度器的内存契约（不原样落库）
// 落库: 调度器将 message + 错误摘要截断后写入 import_tasks.result_message
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    /// 整体成功（存在任何跳过/批次错误即为 false）
    pub success: bool,
    /// 人类可读的汇总
    pub message: String,
    pub imported_count: usize,
    pub updated_count: usize,
    pub skipped_count: usize,
    /// 已处理的非空数据行数
    pub processed_rows: usize,
    /// 行级/批次级诊断信息（有序）
    pub error_messages: Vec<String>,
    /// 行游标是否走到文件末尾（文件级失败时为 false）
    pub completed: bool,
    pub insert_flushes: usize,
    pub update_flushes: usize,
    pub elapsed_ms: u64,
}

impl ImportResult {
    /// 文件级失败：零行处理、零写入
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            error_messages: vec![message.clone()],
            message,
            ..Default::default()
        }
    }

    /// 记录一条行级诊断并计为跳过
    pub fn skip_row(&mut self, diagnostic: String) {
        self.skipped_count += 1;
        self.error_messages.push(diagnostic);
    }

    /// 是否存在跳过或错误
    pub fn has_issues(&self) -> bool {
        self.skipped_count > 0 || !self.error_messages.is_empty()
    }

    /// 实际写入（新增 + 更新）行数
    pub fn written_rows(&self) -> usize {
        self.imported_count + self.updated_count
    }

    /// 行循环结束后收尾：计算 success 并生成汇总信息
    pub fn finish(&mut self, elapsed_ms: u64) {
        self.completed = true;
        self.elapsed_ms = elapsed_ms;
        self.success = !self.has_issues();
        let headline = if self.success {
            "导入完成"
        } else {
            "导入完成（存在问题）"
        };
        self.message = format!(
            "{}: 处理 {} 行, 新增 {} 行, 更新 {} 行, 跳过 {} 行",
            headline,
            self.processed_rows,
            self.imported_count,
            self.updated_count,
            self.skipped_count
        );
    }

    /// 错误摘要：前 limit 条 + 剩余条数标记
    pub fn error_summary(&self, limit: usize) -> String {
        if self.error_messages.is_empty() {
            return String::new();
        }

        let mut lines: Vec<&str> = self
            .error_messages
            .iter()
            .take(limit)
            .map(String::as_str)
            .collect();

        let rest = self.error_messages.len().saturating_sub(limit);
        let more = format!("... 另有 {} 条错误", rest);
        if rest > 0 {
            lines.push(&more);
        }
        lines.join("\n")
    }
}
