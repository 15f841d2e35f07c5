// ==========================================
// 台账导入管道 - 单实例文件锁
// ==========================================
// 机制: 对固定锁文件加非阻塞排他咨询锁（fs2 / flock）
// 释放: Drop 时解锁；进程死亡时由操作系统释放
// ==========================================

use crate::scheduler::error::{RunnerError, RunnerResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// 尝试获取锁
    ///
    /// # 返回
    /// - Ok(Some(lock)): 已获取
    /// - Ok(None): 锁被其他实例持有
    /// - Err: 锁文件无法创建/打开
    pub fn try_acquire(path: &Path) -> RunnerResult<Option<Self>> {
        let io_err = |source| RunnerError::LockFile {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_err)?;

        if let Err(e) = file.try_lock_exclusive() {
            let contended = e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
                || e.kind() == std::io::ErrorKind::WouldBlock;
            if contended {
                return Ok(None);
            }
            return Err(io_err(e));
        }

        // 写入 PID 便于人工排查（失败不影响加锁）
        let _ = file
            .set_len(0)
            .and_then(|_| writeln!(file, "{}", std::process::id()));

        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "锁释放失败");
        }
    }
}
