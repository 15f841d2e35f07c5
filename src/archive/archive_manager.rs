// ==========================================
// 台账导入管道 - 归档管理器
// ==========================================
// 目录: <archive_root>/<判别值>/<状态标签>/<判别值>_<时间戳>_<原文件名>
// 清理: 仅清理本次使用的状态目录，删除超过保留天数的文件
// 失败: 记录日志并返回 false，不影响任务结果
// ==========================================

use crate::domain::ArchiveStatus;
use chrono::Local;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// 文件名清洗：字母数字与 `_.-()` 以外的字符替换为 `_`
///
/// 只保留最后一级文件名，防止原文件名中的路径分隔符逃出归档目录。
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveManager {
    root: PathBuf,
    retention: Duration,
}

impl ArchiveManager {
    pub fn new(root: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            root: root.into(),
            retention: Duration::from_secs(retention_days.saturating_mul(SECONDS_PER_DAY)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 状态目录: <root>/<判别值>/<状态标签>
    pub fn status_dir(&self, discriminator: &str, status: ArchiveStatus) -> PathBuf {
        self.root
            .join(sanitize_file_name(discriminator))
            .join(status.as_str())
    }

    /// 归档源文件
    ///
    /// # 返回
    /// - true: 已移入归档目录（随后执行保留期清理）
    /// - false: 移动失败，源文件留在原处
    pub fn archive(
        &self,
        source: &Path,
        discriminator: &str,
        original_file_name: &str,
        status: ArchiveStatus,
    ) -> bool {
        match self.move_into_archive(source, discriminator, original_file_name, status) {
            Ok(dest) => {
                info!(
                    source = %source.display(),
                    dest = %dest.display(),
                    status = %status,
                    "文件已归档"
                );
                if let Some(dir) = dest.parent() {
                    let removed = self.cleanup_expired(dir, &dest);
                    if removed > 0 {
                        info!(dir = %dir.display(), removed, "已清理过期归档文件");
                    }
                }
                true
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "文件归档失败，保留在原路径");
                false
            }
        }
    }

    fn move_into_archive(
        &self,
        source: &Path,
        discriminator: &str,
        original_file_name: &str,
        status: ArchiveStatus,
    ) -> io::Result<PathBuf> {
        if !source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("源文件不存在: {}", source.display()),
            ));
        }

        let dir = self.status_dir(discriminator, status);
        fs::create_dir_all(&dir)?;

        let dest = Self::unique_destination(
            &dir,
            &format!(
                "{}_{}_{}",
                sanitize_file_name(discriminator),
                Local::now().format("%Y%m%d_%H%M%S"),
                sanitize_file_name(original_file_name)
            ),
        );

        if let Err(rename_err) = fs::rename(source, &dest) {
            // 跨文件系统时 rename 失败，退回复制 + 删除
            debug!(error = %rename_err, "rename 失败，改用复制");
            fs::copy(source, &dest)?;
            if let Err(e) = fs::remove_file(source) {
                warn!(source = %source.display(), error = %e, "归档副本已写入，但源文件删除失败");
            }
        }
        Ok(dest)
    }

    /// 同一秒内同名文件追加序号
    fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
        let candidate = dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        (1..)
            .map(|n| dir.join(format!("{}_{}", n, file_name)))
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }

    /// 删除目录中修改时间早于保留窗口的文件（刚归档的文件除外）
    ///
    /// # 返回
    /// - 删除的文件数
    pub fn cleanup_expired(&self, dir: &Path, keep: &Path) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "归档目录读取失败，跳过清理");
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path == keep || !path.is_file() {
                continue;
            }

            let expired = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .map(|age| age > self.retention)
                .unwrap_or(false);
            if !expired {
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %path.display(), error = %e, "过期归档文件删除失败"),
            }
        }
        removed
    }
}
