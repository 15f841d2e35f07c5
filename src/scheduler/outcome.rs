// ==========================================
// 台账导入管道 - 运行结果与分类
// ==========================================
// 分类: ImportResult → 归档状态标签（决定归档目录与 status 列）
// 结果信息: "[标签] 汇总" + 错误摘要，按字符截断
// ==========================================

use crate::domain::{ArchiveStatus, ImportResult};
use serde::Serialize;

/// 进程退出码
pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_INTERRUPTED: i32 = 130;

/// 由导入结果确定归档状态
///
/// - 文件级失败（未跑完全文件）→ import_failed
/// - 无跳过、无错误 → perfect_success
/// - 有问题但至少写入一行 → completed_with_issues
/// - 有问题且零写入 → import_failed
pub fn classify(result: &ImportResult) -> ArchiveStatus {
    if !result.completed {
        return ArchiveStatus::ImportFailed;
    }
    if !result.has_issues() {
        return ArchiveStatus::PerfectSuccess;
    }
    if result.written_rows() > 0 {
        ArchiveStatus::CompletedWithIssues
    } else {
        ArchiveStatus::ImportFailed
    }
}

/// 按字符（非字节）截断，超出时以 "…" 结尾
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

/// 组装写入 result_message 的文本
pub fn compose_result_message(
    status: ArchiveStatus,
    result: &ImportResult,
    summary_limit: usize,
    max_chars: usize,
) -> String {
    let mut message = format!("[{}] {}", status, result.message);

    // 文件级失败时 message 与唯一的错误信息相同，不重复输出
    let duplicated = result.error_messages.len() == 1 && result.error_messages[0] == result.message;
    let summary = result.error_summary(summary_limit);
    if !summary.is_empty() && !duplicated {
        message.push('\n');
        message.push_str(&summary);
    }

    truncate_chars(&message, max_chars)
}

// ==========================================
// RunOutcome - 一次调度的结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 另一个实例持有文件锁
    LockBusy,
    /// 已有任务处于 processing（上次运行可能崩溃），不重复处理
    TaskAlreadyProcessing { task_id: i64 },
    NoPendingTask,
    /// 认领时任务已被他人推进
    ClaimLost { task_id: i64 },
    Processed {
        task_id: i64,
        target_data_name: String,
        archive_status: ArchiveStatus,
        archived: bool,
        result: ImportResult,
    },
}

impl RunOutcome {
    /// 所有守卫退出与已处理任务（无论任务成败）都视为调度成功
    pub fn exit_code(&self) -> i32 {
        EXIT_OK
    }
}
