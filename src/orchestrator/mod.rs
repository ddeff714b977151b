//! 编排层（Orchestration Layer）
//!
//! ```text
//! batch_processor::App (加载记录、操作员命令、报告)
//!     ↓
//! controller::JobController (状态机、执行循环)
//!     ↓
//! driver::BrowserDriver (单条记录、重试、会话自愈)
//!     ↓
//! infrastructure::JsExecutor (page)
//! ```

pub mod batch_processor;
pub mod operator;

pub use batch_processor::App;
pub use operator::OperatorCommand;
