// ==========================================
// 台账导入管道 - 单次运行上下文
// ==========================================
// 持有: run_id / 当前处理中的任务及其上传文件 / 文件锁 / 兜底参数
// 共享: 调度线程与信号处理、panic 兜底路径共用同一个 Arc<RunContext>，
//       使"崩溃处理必须知道正在处理哪个任务"无需全局变量
// ==========================================

use crate::archive::ArchiveManager;
use crate::config::ImportSettings;
use crate::db::open_sqlite_connection;
use crate::domain::ArchiveStatus;
use crate::repository::{ImportTaskRepository, ImportTaskRepositoryImpl};
use crate::scheduler::outcome::truncate_chars;
use crate::scheduler::run_lock::RunLock;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// 兜底路径上不能因为锁中毒而放弃处理
fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 在途任务的上传文件（强制终止时据此归档）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightFile {
    pub stored_file_path: PathBuf,
    pub target_data_name: String,
    pub original_file_name: String,
}

/// 强制终止路径使用的参数；加载 config_kv 之前使用默认值且不归档
#[derive(Debug)]
struct AbortPolicy {
    message_max_chars: usize,
    archiver: Option<ArchiveManager>,
}

#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    db_path: PathBuf,
    current_task: Mutex<Option<i64>>,
    in_flight_file: Mutex<Option<InFlightFile>>,
    policy: Mutex<AbortPolicy>,
    lock: Mutex<Option<RunLock>>,
}

impl RunContext {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            db_path: db_path.into(),
            current_task: Mutex::new(None),
            in_flight_file: Mutex::new(None),
            policy: Mutex::new(AbortPolicy {
                message_max_chars: ImportSettings::default().result_message_max_chars,
                archiver: None,
            }),
            lock: Mutex::new(None),
        }
    }

    /// 设置强制终止时的 result_message 上限与归档器
    pub fn configure_abort(&self, message_max_chars: usize, archiver: ArchiveManager) {
        *guard(&self.policy) = AbortPolicy {
            message_max_chars,
            archiver: Some(archiver),
        };
    }

    /// 登记/清除在途任务的上传文件；调度器自行归档前会先清除
    pub fn track_file(&self, file: Option<InFlightFile>) {
        *guard(&self.in_flight_file) = file;
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn hold_lock(&self, lock: RunLock) {
        *guard(&self.lock) = Some(lock);
    }

    /// 释放文件锁（幂等）
    pub fn release_lock(&self) -> bool {
        let released = guard(&self.lock).take();
        if let Some(lock) = &released {
            info!(run_id = %self.run_id, path = %lock.path().display(), "文件锁已释放");
        }
        released.is_some()
    }

    pub fn set_current_task(&self, task_id: Option<i64>) {
        *guard(&self.current_task) = task_id;
    }

    pub fn current_task(&self) -> Option<i64> {
        *guard(&self.current_task)
    }

    /// 强制终止当前任务：标记为 failed、尝试归档上传文件、释放文件锁
    ///
    /// 使用独立的新连接，避免依赖正在执行的调度线程所持有的连接。
    /// 返回被标记的任务 ID（没有在途任务或任务已是终态时返回 None）。
    pub fn abort_in_flight(&self, reason: &str) -> Option<i64> {
        let task_id = guard(&self.current_task).take();
        let mut marked = None;

        if let Some(task_id) = task_id {
            let message_max_chars = guard(&self.policy).message_max_chars;
            let message = truncate_chars(
                &format!(
                    "[{}] 任务被强制终止: {}",
                    ArchiveStatus::UnknownProcessingError,
                    reason
                ),
                message_max_chars,
            );
            let finished_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

            match open_sqlite_connection(&self.db_path) {
                Ok(conn) => {
                    let repo = ImportTaskRepositoryImpl::new(Arc::new(Mutex::new(conn)));
                    match repo.force_fail(task_id, &finished_at, &message) {
                        Ok(true) => {
                            warn!(run_id = %self.run_id, task_id, reason, "在途任务已强制标记为 failed");
                            marked = Some(task_id);
                        }
                        Ok(false) => {
                            info!(run_id = %self.run_id, task_id, "任务已是终态，无需强制标记");
                        }
                        Err(e) => {
                            error!(run_id = %self.run_id, task_id, error = %e, "强制标记任务失败，需人工处理");
                        }
                    }
                }
                Err(e) => {
                    error!(run_id = %self.run_id, task_id, error = %e, "兜底连接打开失败，需人工处理");
                }
            }

            self.archive_in_flight_file(task_id);
        }

        self.release_lock();
        marked
    }

    fn archive_in_flight_file(&self, task_id: i64) {
        let Some(file) = guard(&self.in_flight_file).take() else {
            return;
        };
        let policy = guard(&self.policy);
        match &policy.archiver {
            Some(archiver) => {
                archiver.archive(
                    &file.stored_file_path,
                    &file.target_data_name,
                    &file.original_file_name,
                    ArchiveStatus::UnknownProcessingError,
                );
            }
            None => {
                warn!(
                    run_id = %self.run_id,
                    task_id,
                    file = %file.stored_file_path.display(),
                    "归档器尚未配置，上传文件保留在原路径"
                );
            }
        }
    }
}
