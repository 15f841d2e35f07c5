// ==========================================
// 台账导入管道 - 调度层
// ==========================================
// 职责: 单实例调度、任务认领与完结、崩溃兜底
// ==========================================

pub mod error;
pub mod outcome;
pub mod run_context;
pub mod run_lock;
pub mod task_runner;

pub use error::{RunnerError, RunnerResult};
pub use outcome::{
    classify, compose_result_message, truncate_chars, RunOutcome, EXIT_FAILURE, EXIT_INTERRUPTED,
    EXIT_OK,
};
pub use run_context::{InFlightFile, RunContext};
pub use run_lock::RunLock;
pub use task_runner::{RegistryFactory, TaskRunner};
