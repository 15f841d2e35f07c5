// ==========================================
// 台账导入管道 - 启动路径配置
// ==========================================
// 优先级: 命令行参数 > 环境变量 > 默认值（用户本地数据目录）
// ==========================================

use std::path::PathBuf;

pub const ENV_BASE_DIR: &str = "IMPORT_RUNNER_BASE_DIR";
pub const ENV_DB_PATH: &str = "IMPORT_RUNNER_DB_PATH";
pub const ENV_ARCHIVE_DIR: &str = "IMPORT_RUNNER_ARCHIVE_DIR";

const APP_DIR_NAME: &str = "ledger-import";
const DB_FILE_NAME: &str = "ledger_import.db";
const LOCK_FILE_NAME: &str = "import_task_runner.lock";

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    /// 可写任务目录（放置锁文件）
    pub tasks_dir: PathBuf,
    pub archive_root: PathBuf,
}

impl RunnerConfig {
    /// 以 base_dir 为根推导全部路径
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            db_path: base_dir.join(DB_FILE_NAME),
            tasks_dir: base_dir.join("tasks"),
            archive_root: base_dir.join("archive"),
            base_dir,
        }
    }

    /// 默认根目录: <用户本地数据目录>/ledger-import，取不到时退回当前目录
    pub fn default_base_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    /// 命令行参数优先，缺省项从环境变量补齐（空值视为未设置）
    pub fn from_args_or_env(
        base_dir: Option<PathBuf>,
        db_path: Option<PathBuf>,
        archive_root: Option<PathBuf>,
    ) -> Self {
        Self::resolve(
            base_dir.or_else(|| env_path(ENV_BASE_DIR)),
            db_path.or_else(|| env_path(ENV_DB_PATH)),
            archive_root.or_else(|| env_path(ENV_ARCHIVE_DIR)),
        )
    }

    pub fn resolve(
        base_dir: Option<PathBuf>,
        db_path: Option<PathBuf>,
        archive_root: Option<PathBuf>,
    ) -> Self {
        let mut config = Self::from_base_dir(base_dir.unwrap_or_else(Self::default_base_dir));
        if let Some(db_path) = db_path {
            config.db_path = db_path;
        }
        if let Some(archive_root) = archive_root {
            config.archive_root = archive_root;
        }
        config
    }

    pub fn lock_path(&self) -> PathBuf {
        self.tasks_dir.join(LOCK_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_derive_from_base_dir() {
        let config = RunnerConfig::from_base_dir("/srv/ledger");
        assert_eq!(config.db_path, PathBuf::from("/srv/ledger/ledger_import.db"));
        assert_eq!(
            config.lock_path(),
            PathBuf::from("/srv/ledger/tasks/import_task_runner.lock")
        );
        assert_eq!(config.archive_root, PathBuf::from("/srv/ledger/archive"));
    }

    #[test]
    fn test_explicit_overrides_win() {
        let config = RunnerConfig::resolve(
            Some(PathBuf::from("/srv/ledger")),
            Some(PathBuf::from("/data/app.db")),
            Some(PathBuf::from("/mnt/archive")),
        );
        assert_eq!(config.db_path, PathBuf::from("/data/app.db"));
        assert_eq!(config.archive_root, PathBuf::from("/mnt/archive"));
        assert_eq!(config.tasks_dir, PathBuf::from("/srv/ledger/tasks"));
    }

    #[test]
    fn test_cli_value_beats_env() {
        let config = RunnerConfig::from_args_or_env(
            Some(PathBuf::from("/srv/ledger")),
            Some(PathBuf::from("/data/cli.db")),
            None,
        );
        assert_eq!(config.db_path, PathBuf::from("/data/cli.db"));
        assert_eq!(config.base_dir, PathBuf::from("/srv/ledger"));
    }
}
