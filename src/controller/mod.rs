//! 任务控制器 - 编排层
//!
//! ## 职责
//!
//! - 持有批次记录、状态机、控制信号与状态快照
//! - 每个活动任务运行一个后台执行循环
//! - `start` / `pause` / `resume` / `kill` 与 `status` 可以和执行循环并发调用
//!
//! ## 一致性
//!
//! 任务的可变字段（状态、位置、计数、日志、错误）全部放在同一把锁后面，
//! 执行循环每处理完一条记录就在一次加锁内整体更新，`status()` 在同一把锁下读取快照，
//! 因此不会看到计数与日志不一致的中间状态。

mod job;
mod job_controller;
mod runner;
mod signals;

pub use job::{
    JobSnapshot, JobStatus, KillReceipt, LogEntry, LogOutcome, PauseReceipt, ResumeReceipt,
    StartReceipt,
};
pub use job_controller::JobController;
pub use signals::{Halt, JobSignals};

pub(crate) use job_controller::ControllerState;
