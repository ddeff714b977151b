//! 提交驱动 - 单条记录的执行者
//!
//! 控制器只认识 [`SubmissionDriver`]：打开会话、关闭会话、提交一条记录。
//! 重试与会话自愈都封装在驱动内部，控制器每条记录只调用一次。

pub mod browser_driver;
pub mod form;
pub mod retry;

pub use browser_driver::BrowserDriver;
pub use form::FormSelectors;
pub use retry::RetryPolicy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::models::Record;

/// 是否真正点击提交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// 只填写不提交
    #[default]
    DryRun,
    Live,
}

impl SubmitMode {
    pub fn from_live_flag(live: bool) -> Self {
        if live {
            SubmitMode::Live
        } else {
            SubmitMode::DryRun
        }
    }

    pub fn is_live(self) -> bool {
        self == SubmitMode::Live
    }
}

/// 一次 `fill_one` 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub success: bool,
    pub detail: String,
    pub subject_label: String,
    /// 最后一次失败是否由会话丢失引起
    #[serde(skip)]
    pub session_lost: bool,
}

impl Outcome {
    pub fn success(subject_label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
            subject_label: subject_label.into(),
            session_lost: false,
        }
    }

    pub fn failure(subject_label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
            subject_label: subject_label.into(),
            session_lost: false,
        }
    }

    pub fn with_session_lost(mut self, session_lost: bool) -> Self {
        self.session_lost = session_lost;
        self
    }
}

/// 提交驱动
///
/// 约定：
/// - `open` 幂等，已打开时什么也不做
/// - `close` 在从未打开时调用也是安全的
/// - `fill_one` 用尽重试后返回失败的 `Outcome` 而不是错误；
///   只有驱动本身不可用时才返回 `Err`
#[async_trait]
pub trait SubmissionDriver: Send + Sync {
    async fn open(&self) -> Result<(), DriverError>;

    async fn close(&self);

    async fn fill_one(
        &self,
        target: &str,
        record: &Record,
        mode: SubmitMode,
    ) -> Result<Outcome, DriverError>;
}
