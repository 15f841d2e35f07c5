// ==========================================
// 台账导入管道 - 调度入口
// ==========================================
// 由外部定时器（cron 等）触发，每次至多处理一个任务
// 用法:
//   ledger-import-runner [--base-dir <dir>] [--db <path>] [--archive-dir <dir>] [--json]
// 退出码: 0 正常（含所有守卫退出与任务失败）/ 1 调度器错误 / 130 收到终止信号
// ==========================================

use anyhow::{bail, Context};
use ledger_import::config::RunnerConfig;
use ledger_import::logging;
use ledger_import::scheduler::{RunContext, RunOutcome, TaskRunner, EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK};
use serde_json::json;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const USAGE: &str =
    "用法: ledger-import-runner [--base-dir <dir>] [--db <path>] [--archive-dir <dir>] [--json]";

#[derive(Debug, Default)]
struct CliArgs {
    base_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    archive_dir: Option<PathBuf>,
    json: bool,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--base-dir" => {
                parsed.base_dir = Some(args.next().context("--base-dir 缺少参数")?.into())
            }
            "--db" => parsed.db_path = Some(args.next().context("--db 缺少参数")?.into()),
            "--archive-dir" => {
                parsed.archive_dir = Some(args.next().context("--archive-dir 缺少参数")?.into())
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => parsed.help = true,
            other => bail!("未知参数: {}", other),
        }
    }
    Ok(parsed)
}

/// panic 钩子只记录日志；任务的兜底标记由 catch_unwind / JoinError / 退出检查负责
fn install_panic_hook(context: Arc<RunContext>) {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        error!(
            run_id = %context.run_id(),
            task_id = ?context.current_task(),
            panic = %info,
            "发生 panic"
        );
        default_hook(info);
    }));
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM 监听安装失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = terminate => {},
    }
}

fn print_summary(context: &RunContext, exit_code: i32, outcome: Option<&RunOutcome>, error: Option<String>) {
    let summary = json!({
        "run_id": context.run_id().to_string(),
        "exit_code": exit_code,
        "outcome": outcome,
        "error": error,
    });
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => warn!(error = %e, "运行摘要序列化失败"),
    }
}

async fn run(config: RunnerConfig, context: Arc<RunContext>, json: bool) -> i32 {
    let runner = TaskRunner::new(config, Arc::clone(&context));
    let handle = tokio::task::spawn_blocking(move || runner.run());

    tokio::select! {
        joined = handle => match joined {
            Ok(Ok(outcome)) => {
                let code = outcome.exit_code();
                info!(outcome = ?outcome, "调度结束");
                if json {
                    print_summary(&context, code, Some(&outcome), None);
                }
                code
            }
            Ok(Err(e)) => {
                error!(error = %e, "调度器错误");
                if json {
                    print_summary(&context, EXIT_FAILURE, None, Some(e.to_string()));
                }
                EXIT_FAILURE
            }
            Err(join_err) => {
                error!(error = %join_err, "调度线程异常终止");
                context.abort_in_flight(&format!("调度线程异常终止: {}", join_err));
                if json {
                    print_summary(&context, EXIT_FAILURE, None, Some(join_err.to_string()));
                }
                EXIT_FAILURE
            }
        },
        _ = shutdown_signal() => {
            warn!("收到终止信号，强制结束在途任务");
            context.abort_in_flight("收到终止信号");
            if json {
                print_summary(&context, EXIT_INTERRUPTED, None, Some("interrupted".to_string()));
            }
            EXIT_INTERRUPTED
        }
    }
}

fn real_main() -> i32 {
    logging::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return EXIT_FAILURE;
        }
    };
    if args.help {
        println!("{}", USAGE);
        return EXIT_OK;
    }

    let config = RunnerConfig::from_args_or_env(args.base_dir, args.db_path, args.archive_dir);
    let context = Arc::new(RunContext::new(&config.db_path));

    info!(
        app = ledger_import::APP_NAME,
        version = ledger_import::VERSION,
        run_id = %context.run_id(),
        db = %config.db_path.display(),
        archive_root = %config.archive_root.display(),
        "调度器启动"
    );

    install_panic_hook(Arc::clone(&context));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "tokio 运行时创建失败");
            return EXIT_FAILURE;
        }
    };

    let code = runtime.block_on(run(config, Arc::clone(&context), args.json));
    // 信号退出时调度线程可能仍在运行，不等待
    runtime.shutdown_background();

    if context.current_task().is_some() {
        context.abort_in_flight("进程退出时任务仍处于处理中");
    }
    code
}

fn main() {
    std::process::exit(real_main());
}
