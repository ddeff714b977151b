//! # Form Batch Submit
//!
//! 通过自动化浏览器把一批已清洗的记录逐条提交到远端表单，
//! 并支持开始、暂停、继续、终止与状态查询。
//!
//! ## 分层
//!
//! - `infrastructure/` - `JsExecutor`，持有 page，只暴露导航和 eval 能力
//! - `browser/` - 浏览器会话的启动、连接与关闭
//! - `driver/` - `SubmissionDriver`：单条记录的填写、有界重试与会话自愈
//! - `controller/` - `JobController`：状态机、后台执行循环、状态快照
//! - `orchestrator/` - 命令行入口 `App`

pub mod browser;
pub mod config;
pub mod controller;
pub mod driver;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use controller::{JobController, JobSnapshot, JobStatus};
pub use driver::{BrowserDriver, Outcome, SubmissionDriver, SubmitMode};
pub use error::{AppError, AppResult, ControlError, DriverError};
pub use models::{Record, RecordFields};
pub use orchestrator::App;
