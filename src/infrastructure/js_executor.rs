//! JS 执行器 - 基础设施层
//!
//! 持有一次尝试所用的 page，只暴露"导航"和"执行 JS"的能力

use std::time::Duration;

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

use crate::driver::form::READY_STATE_SCRIPT;
use crate::error::DriverError;

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 不认识 Record / 表单字段
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    /// 创建新的 JS 执行器
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 导航并等待页面加载完成
    pub async fn navigate(&self, url: &str, limit: Duration) -> Result<(), DriverError> {
        debug!("导航到: {}", url);
        let navigation = async {
            self.page.goto(url).await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match timeout(limit, navigation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(DriverError::classify(e.to_string(), |detail| {
                    DriverError::Navigation {
                        url: url.to_string(),
                        detail,
                    }
                }))
            }
            Err(_) => {
                return Err(DriverError::Timeout {
                    stage: format!("导航到 {}", url),
                    after_ms: limit.as_millis() as u64,
                })
            }
        }

        self.wait_ready(limit).await
    }

    /// 轮询 `document.readyState` 直到 `complete`
    async fn wait_ready(&self, limit: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + limit;
        loop {
            let state: String = self.eval_as(READY_STATE_SCRIPT).await?;
            if state == "complete" {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    stage: "等待页面加载".to_string(),
                    after_ms: limit.as_millis() as u64,
                });
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> Result<JsonValue, DriverError> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> Result<T, DriverError> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 关闭 page
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("关闭页面失败: {}", e);
        }
    }
}
