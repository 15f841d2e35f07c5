// ==========================================
// 台账导入管道 - 性能与资源诊断
// ==========================================
// SQL 计数 / 慢 SQL 日志 / 常驻内存读取
// 只用于诊断，不参与任何控制逻辑
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const ENV_PERF_SQL: &str = "IMPORT_RUNNER_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "IMPORT_RUNNER_SLOW_SQL_MS";

const SLOW_SQL_LOG_CHARS: usize = 420;

static TRACE_ON: AtomicBool = AtomicBool::new(false);
static SLOW_MS: AtomicU64 = AtomicU64::new(0);

/// 当前线程的 SQL 计数（仅在至少一个 PerfGuard 存活时累加）
#[derive(Debug, Clone, Copy, Default)]
struct SqlCounters {
    scopes: u32,
    statements: u64,
    slow: u64,
}

thread_local! {
    static COUNTERS: Cell<SqlCounters> = Cell::new(SqlCounters::default());
}

fn update_counters(f: impl FnOnce(&mut SqlCounters)) {
    COUNTERS.with(|cell| {
        let mut counters = cell.get();
        f(&mut counters);
        cell.set(counters);
    });
}

fn snapshot() -> SqlCounters {
    COUNTERS.with(Cell::get)
}

/// SQL 追踪开关与慢查询阈值（来自环境变量）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SqlTraceSettings {
    enabled: bool,
    slow_ms: u64,
}

impl SqlTraceSettings {
    /// Debug 构建默认开启、阈值 50ms；Release 默认关闭、阈值 200ms
    fn from_env() -> Self {
        let enabled = std::env::var(ENV_PERF_SQL)
            .map(|v| {
                matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(cfg!(debug_assertions));
        let slow_ms = std::env::var(ENV_SLOW_SQL_MS)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
        Self { enabled, slow_ms }
    }
}

/// 按字符截断并压成单行（SQL 中可能含中文字面量）
fn truncate_sql(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// 为连接挂上 profile 回调（语句执行完毕时触发一次）
///
/// - `IMPORT_RUNNER_PERF_SQL=1|0` 强制开关
/// - `IMPORT_RUNNER_SLOW_SQL_MS=<ms>` 慢 SQL 阈值（0 = 不记录）
///
/// 只注册 profile：它与 trace 共用同一个掩码，后注册的一方会覆盖前者
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = SqlTraceSettings::from_env();
    TRACE_ON.store(settings.enabled, Ordering::Relaxed);
    SLOW_MS.store(settings.slow_ms, Ordering::Relaxed);

    if settings.enabled {
        conn.profile(Some(on_statement_finished));
    } else {
        conn.profile(None);
    }
}

fn on_statement_finished(sql: &str, duration: Duration) {
    if !TRACE_ON.load(Ordering::Relaxed) {
        return;
    }
    update_counters(|c| {
        if c.scopes > 0 {
            c.statements = c.statements.saturating_add(1);
        }
    });

    let threshold = SLOW_MS.load(Ordering::Relaxed);
    let duration_ms = duration.as_millis() as u64;
    if threshold == 0 || duration_ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms,
        threshold_ms = threshold,
        sql = %truncate_sql(sql, SLOW_SQL_LOG_CHARS),
        "慢 SQL"
    );
    update_counters(|c| {
        if c.scopes > 0 {
            c.slow = c.slow.saturating_add(1);
        }
    });
}

/// 当前进程常驻内存（KB），读取 /proc/self/status 的 VmRSS；非 Linux 返回 None
pub fn resident_memory_kb() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}

/// 作用域计时：drop 时输出耗时、SQL 语句数、慢 SQL 数
///
/// ```ignore
/// let _perf = ledger_import::perf::PerfGuard::new("flush_insert_batch").with_label("products");
/// ```
pub struct PerfGuard {
    op: &'static str,
    label: &'static str,
    started: Instant,
    baseline: SqlCounters,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        update_counters(|c| c.scopes = c.scopes.saturating_add(1));
        Self {
            op,
            label: "",
            started: Instant::now(),
            baseline: snapshot(),
        }
    }

    /// 附加标签（通常为目标表名）
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// 本作用域内已执行的 SQL 语句数
    pub fn sql_count(&self) -> u64 {
        snapshot().statements.saturating_sub(self.baseline.statements)
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let now = snapshot();
        tracing::debug!(
            target: "perf",
            op = self.op,
            label = self.label,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count = now.statements.saturating_sub(self.baseline.statements),
            slow_sql_count = now.slow.saturating_sub(self.baseline.slow),
            "作用域结束"
        );
        update_counters(|c| c.scopes = c.scopes.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_sql_flattens_and_is_char_safe() {
        let sql = "SELECT '商品名称'\n    FROM products";
        assert_eq!(truncate_sql(sql, 10), "SELECT '商品…");
        assert_eq!(truncate_sql("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql("SELECT *\n  FROM t", 100), "SELECT * FROM t");
    }

    #[test]
    fn test_perf_guard_counts_profiled_statements() {
        std::env::set_var(ENV_PERF_SQL, "1");
        let mut conn = Connection::open_in_memory().unwrap();
        install_sqlite_tracing(&mut conn);

        let guard = PerfGuard::new("test").with_label("demo");
        conn.execute("CREATE TABLE t (a INTEGER)", []).unwrap();
        conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
        conn.execute("INSERT INTO t VALUES (2)", []).unwrap();
        assert!(guard.sql_count() >= 3, "sql_count = {}", guard.sql_count());
    }

    #[test]
    fn test_statements_outside_guard_are_not_counted() {
        TRACE_ON.store(true, Ordering::Relaxed);
        update_counters(|c| c.statements = 0);
        on_statement_finished("SELECT 1", Duration::from_millis(1));
        assert_eq!(snapshot().statements, 0);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_resident_memory_is_reported_on_linux() {
        assert!(resident_memory_kb().unwrap_or(0) > 0);
    }
}
