// ==========================================
// 台账导入管道 - 任务调度器
// ==========================================
// 流程: 文件锁 → processing 守卫 → 认领最早 pending → 分派实体服务
//       → 分类并落库结果 → 归档 → 释放锁
// 守卫: 文件锁与 processing 状态检查是两道独立的关卡，缺一不可
// ==========================================

use crate::archive::ArchiveManager;
use crate::config::{ConfigManager, ImportSettings, RunnerConfig};
use crate::db::{missing_tables, open_sqlite_connection, REQUIRED_TABLES};
use crate::domain::{ArchiveStatus, ImportResult, ImportTask};
use crate::importer::ImportServiceRegistry;
use crate::perf::install_sqlite_tracing;
use crate::repository::{ImportTaskRepository, ImportTaskRepositoryImpl, RepositoryError};
use crate::scheduler::error::RunnerResult;
use crate::scheduler::outcome::{classify, compose_result_message, RunOutcome};
use crate::scheduler::run_context::{InFlightFile, RunContext};
use crate::scheduler::run_lock::RunLock;
use chrono::Local;
use rusqlite::Connection;
use std::any::Any;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info, instrument, warn};

fn now_text() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

/// 退出作用域时释放文件锁（正常返回、错误返回、panic 展开）
struct LockRelease<'a>(&'a RunContext);

impl Drop for LockRelease<'_> {
    fn drop(&mut self) {
        self.0.release_lock();
    }
}

/// 服务注册表的构造方式（测试中可替换为自定义服务）
pub type RegistryFactory<'a> = dyn Fn(Arc<Mutex<Connection>>, &ImportSettings) -> ImportServiceRegistry + 'a;

// ==========================================
// TaskRunner - 单次调度
// ==========================================
pub struct TaskRunner {
    config: RunnerConfig,
    context: Arc<RunContext>,
}

impl TaskRunner {
    pub fn new(config: RunnerConfig, context: Arc<RunContext>) -> Self {
        Self { config, context }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.context
    }

    /// 执行一次调度（使用默认的六种实体服务）
    pub fn run(&self) -> RunnerResult<RunOutcome> {
        self.run_with(&|conn: Arc<Mutex<Connection>>, settings: &ImportSettings| {
            ImportServiceRegistry::with_default_services(conn, settings.clone())
        })
    }

    /// 执行一次调度
    ///
    /// # 返回
    /// - Ok(outcome): 守卫退出或已处理一个任务（任务失败也是 Ok）
    /// - Err: 调度器自身出错；若已认领任务，任务会被强制标记为 failed
    #[instrument(skip_all, fields(run_id = %self.context.run_id()))]
    pub fn run_with(&self, registry_factory: &RegistryFactory<'_>) -> RunnerResult<RunOutcome> {
        let outcome = self.run_locked(registry_factory);
        if let Err(e) = &outcome {
            error!(error = %e, "调度执行出错");
            if self.context.current_task().is_some() {
                self.context.abort_in_flight(&format!("调度执行出错: {}", e));
            }
        }
        outcome
    }

    fn run_locked(&self, registry_factory: &RegistryFactory<'_>) -> RunnerResult<RunOutcome> {
        // 1. 文件锁
        let lock_path = self.config.lock_path();
        let lock = match RunLock::try_acquire(&lock_path)? {
            Some(lock) => lock,
            None => {
                info!(lock = %lock_path.display(), "另一个调度实例正在运行，本次退出");
                return Ok(RunOutcome::LockBusy);
            }
        };
        self.context.hold_lock(lock);
        let _release = LockRelease(&self.context);

        let mut conn = open_sqlite_connection(&self.config.db_path)?;
        install_sqlite_tracing(&mut conn);
        let missing = missing_tables(&conn, REQUIRED_TABLES)?;
        if !missing.is_empty() {
            warn!(missing = ?missing, "数据库缺少预期的表（不做迁移）");
        }
        let conn = Arc::new(Mutex::new(conn));
        let config_manager = ConfigManager::from_connection(Arc::clone(&conn))?;
        let settings = config_manager.load_import_settings()?;
        let overrides = config_manager.get_config_snapshot()?;
        if !overrides.is_empty() {
            info!(overrides = ?overrides, settings = ?settings, "已应用 config_kv 覆盖项");
        }
        let archiver = ArchiveManager::new(&self.config.archive_root, settings.archive_retention_days);
        self.context.configure_abort(settings.result_message_max_chars, archiver.clone());
        let tasks = ImportTaskRepositoryImpl::new(Arc::clone(&conn));

        // 2. processing 守卫
        if let Some(task) = tasks.find_processing()? {
            warn!(
                task_id = task.id,
                started_at = ?task.processing_started_at,
                "已有任务处于 processing，跳过本次调度（需人工或崩溃处理确认）"
            );
            return Ok(RunOutcome::TaskAlreadyProcessing { task_id: task.id });
        }

        // 3. 最早的 pending 任务
        let task = match tasks.find_oldest_pending()? {
            Some(task) => task,
            None => {
                info!("没有待处理任务");
                return Ok(RunOutcome::NoPendingTask);
            }
        };

        // 4. 认领
        match tasks.mark_processing(task.id, &now_text()) {
            Ok(()) => {}
            Err(RepositoryError::ClaimConflict { task_id }) => {
                warn!(task_id, "任务认领冲突");
                return Ok(RunOutcome::ClaimLost { task_id });
            }
            Err(e) => return Err(e.into()),
        }
        self.context.set_current_task(Some(task.id));
        self.context.track_file(Some(InFlightFile {
            stored_file_path: task.stored_file_path.clone().into(),
            target_data_name: task.target_data_name.clone(),
            original_file_name: task.original_file_name.clone(),
        }));
        info!(
            task_id = task.id,
            target = %task.target_data_name,
            file = %task.original_file_name,
            "任务已认领"
        );

        // 5. 分派
        let registry = registry_factory(Arc::clone(&conn), &settings);
        let (archive_status, result) = self.dispatch(&registry, &task);
        if conn.is_poisoned() {
            // 服务 panic 时可能持有连接锁；事务已随展开回滚
            conn.clear_poison();
        }

        // 6. 落库结果
        let message = compose_result_message(
            archive_status,
            &result,
            settings.error_summary_limit,
            settings.result_message_max_chars,
        );
        let persisted = tasks.mark_finished(
            task.id,
            archive_status.task_status(),
            &now_text(),
            &message,
        );
        if persisted.is_ok() {
            self.context.set_current_task(None);
        }
        info!(
            task_id = task.id,
            archive_status = %archive_status,
            processed_rows = result.processed_rows,
            imported = result.imported_count,
            updated = result.updated_count,
            skipped = result.skipped_count,
            "任务处理结束"
        );

        // 7. 归档（失败只记录日志）
        self.context.track_file(None);
        let archived = archiver.archive(
            Path::new(&task.stored_file_path),
            &task.target_data_name,
            &task.original_file_name,
            archive_status,
        );

        persisted?;
        Ok(RunOutcome::Processed {
            task_id: task.id,
            target_data_name: task.target_data_name,
            archive_status,
            archived,
            result,
        })
    }

    /// 分派到实体服务，返回归档状态与导入结果（不会 panic）
    fn dispatch(
        &self,
        registry: &ImportServiceRegistry,
        task: &ImportTask,
    ) -> (ArchiveStatus, ImportResult) {
        let path = Path::new(&task.stored_file_path);
        if let Err(e) = File::open(path).and_then(|f| f.metadata()).and_then(|m| {
            if m.is_file() {
                Ok(())
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "不是普通文件"))
            }
        }) {
            warn!(task_id = task.id, path = %path.display(), error = %e, "上传文件不可读");
            return (
                ArchiveStatus::ImportFailed,
                ImportResult::failure(format!("上传文件不可读: {} ({})", path.display(), e)),
            );
        }

        let service = match registry.resolve(&task.target_data_name) {
            Some(service) => service,
            None => {
                warn!(task_id = task.id, target = %task.target_data_name, "未知的导入目标");
                return (
                    ArchiveStatus::ServiceReturnError,
                    ImportResult::failure(format!("未知的导入目标: {}", task.target_data_name)),
                );
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| service.process_file(path))) {
            Ok(result) => (classify(&result), result),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(task_id = task.id, panic = %reason, "导入服务异常终止");
                (
                    ArchiveStatus::TaskProcessingException,
                    ImportResult::failure(format!("导入服务异常终止: {}", reason)),
                )
            }
        }
    }
}
