//! 单条记录的有界重试

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::DriverError;

/// 重试结果
#[derive(Debug)]
pub enum RetryResult<T> {
    Succeeded(T),
    /// 所有尝试都失败，保留最后一次的错误
    Exhausted { last_error: DriverError, attempts: u32 },
}

/// 重试策略：固定次数、固定间隔
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    /// 执行 `attempt` 直到成功或次数用尽
    ///
    /// 会话丢失时先调用 `recover` 重建会话再进入下一次尝试。
    /// 不可恢复的错误立即返回 `Err`，不再重试。
    pub async fn run<T, A, AFut, R, RFut>(
        &self,
        mut attempt: A,
        mut recover: R,
    ) -> Result<RetryResult<T>, DriverError>
    where
        A: FnMut(u32) -> AFut,
        AFut: Future<Output = Result<T, DriverError>>,
        R: FnMut() -> RFut,
        RFut: Future<Output = ()>,
    {
        let mut attempt_no = 1;
        loop {
            let err = match attempt(attempt_no).await {
                Ok(value) => return Ok(RetryResult::Succeeded(value)),
                Err(e) if !e.is_recoverable() => return Err(e),
                Err(e) => e,
            };

            warn!("第 {}/{} 次尝试失败: {}", attempt_no, self.max_attempts, err);

            if attempt_no >= self.max_attempts {
                return Ok(RetryResult::Exhausted {
                    last_error: err,
                    attempts: self.max_attempts,
                });
            }

            if err.is_session_loss() {
                warn!("⚠️ 检测到浏览器会话丢失，重建会话后重试");
                recover().await;
            }

            info!("重试中... ({}/{})", attempt_no + 1, self.max_attempts);
            sleep(self.delay).await;
            attempt_no += 1;
        }
    }
}
