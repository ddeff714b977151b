//! 基于 chromiumoxide 的提交驱动
//!
//! 一个驱动持有一个浏览器会话，每次尝试新开一个 page，尝试结束即关闭。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::driver::form::{self, AgreementReport, FormSelectors, PageProbe, SettleTracker, SubmitSettle};
use crate::driver::retry::{RetryPolicy, RetryResult};
use crate::driver::{Outcome, SubmissionDriver, SubmitMode};
use crate::error::DriverError;
use crate::infrastructure::JsExecutor;
use crate::models::Record;

/// 提交后等待页面稳定的上限
const SUBMIT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);
/// 未跳转时，请求静默多久视为提交完成
const SUBMIT_QUIET_PERIOD: Duration = Duration::from_millis(500);
const SUBMIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct BrowserDriver {
    config: Config,
    selectors: FormSelectors,
    retry: RetryPolicy,
    session: Mutex<Option<BrowserSession>>,
}

impl BrowserDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            selectors: FormSelectors::default(),
            retry: RetryPolicy::from_config(config),
            session: Mutex::new(None),
        }
    }

    /// 会话不存在或已断开时重新建立
    async fn ensure_session(&self) -> Result<(), DriverError> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            if session.is_alive() {
                return Ok(());
            }
            warn!("浏览器事件循环已退出，丢弃旧会话");
            if let Some(stale) = guard.take() {
                stale.shutdown().await;
            }
        }

        let session = BrowserSession::establish(&self.config).await?;
        *guard = Some(session);
        Ok(())
    }

    /// 关闭并重建会话，失败只记录日志，由下一次尝试决定是否致命
    async fn recycle_session(&self) {
        self.shutdown_session().await;
        match self.ensure_session().await {
            Ok(()) => info!("✓ 浏览器会话已重建"),
            Err(e) => error!("重建浏览器会话失败: {}", e),
        }
    }

    async fn shutdown_session(&self) {
        let session = self.session.lock().await.take();
        if let Some(session) = session {
            session.shutdown().await;
        }
    }

    async fn new_executor(&self) -> Result<JsExecutor, DriverError> {
        let guard = self.session.lock().await;
        match guard.as_ref() {
            Some(session) => Ok(JsExecutor::new(session.new_page().await?)),
            None => Err(DriverError::SessionLost {
                detail: "浏览器会话未打开".to_string(),
            }),
        }
    }

    /// 单次尝试：新开 page → 填写 → 关闭 page
    async fn attempt_once(
        &self,
        target: &str,
        record: &Record,
        mode: SubmitMode,
        attempt_no: u32,
    ) -> Result<String, DriverError> {
        debug!("[行 {}] 第 {} 次尝试", record.row_number, attempt_no);

        self.ensure_session().await?;
        let executor = self.new_executor().await?;
        let result = self.fill_page(&executor, target, record, mode).await;
        executor.close().await;
        result
    }

    async fn fill_page(
        &self,
        executor: &JsExecutor,
        target: &str,
        record: &Record,
        mode: SubmitMode,
    ) -> Result<String, DriverError> {
        executor
            .navigate(target, self.config.navigation_timeout())
            .await?;

        for (field, value) in record.fields.iter() {
            let selector = self.selectors.for_field(field);
            debug!("[行 {}] 填写 {}: {}", record.row_number, field, value);

            let found: bool = executor
                .eval_as(form::fill_field_script(selector, value)?)
                .await?;
            if !found {
                return Err(DriverError::FieldNotFound {
                    field: field.to_string(),
                    selector: selector.to_string(),
                });
            }
        }

        // 等待表单处理输入
        sleep(self.config.settle_delay()).await;

        self.check_agreements(executor, record.row_number).await;

        if mode.is_live() {
            warn!("[行 {}] ⚠️ 正在提交表单!", record.row_number);
            let baseline: usize = executor.eval_as(form::MARK_DOCUMENT_SCRIPT).await?;
            let clicked: bool = executor
                .eval_as(form::submit_script(&self.selectors.submit_button)?)
                .await?;
            if !clicked {
                return Err(DriverError::Submit {
                    detail: format!("未找到提交按钮 ({})", self.selectors.submit_button),
                });
            }

            match self.wait_submit_settled(executor, baseline).await? {
                Some(SubmitSettle::Navigated) => {
                    debug!("[行 {}] 提交后页面已跳转", record.row_number)
                }
                Some(SubmitSettle::RequestsIdle) => {
                    debug!("[行 {}] 提交请求已完成", record.row_number)
                }
                None => warn!(
                    "[行 {}] {} 秒内未观察到页面跳转或请求完成",
                    record.row_number,
                    SUBMIT_SETTLE_TIMEOUT.as_secs()
                ),
            }
            info!("[行 {}] ✓ 表单已提交", record.row_number);
            Ok("表单已提交".to_string())
        } else {
            info!("[行 {}] ✓ 表单已填写（演练模式，未提交）", record.row_number);
            Ok("表单已填写（演练模式，未提交）".to_string())
        }
    }

    /// 点击提交后等待页面跳转或请求静默，超时返回 `None`
    ///
    /// 跳转过程中页面脚本可能执行失败，这类错误只记录日志并继续轮询。
    async fn wait_submit_settled(
        &self,
        executor: &JsExecutor,
        baseline: usize,
    ) -> Result<Option<SubmitSettle>, DriverError> {
        let started = Instant::now();
        let deadline = started + SUBMIT_SETTLE_TIMEOUT;
        let mut tracker = SettleTracker::new(baseline, started, SUBMIT_QUIET_PERIOD);

        loop {
            match executor.eval_as::<PageProbe>(form::PAGE_PROBE_SCRIPT).await {
                Ok(probe) => {
                    if let Some(settle) = tracker.observe(&probe, Instant::now()) {
                        return Ok(Some(settle));
                    }
                }
                Err(e) if e.is_session_loss() => return Err(e),
                Err(e) => debug!("提交后页面探测失败: {}", e),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(SUBMIT_POLL_INTERVAL).await;
        }
    }

    /// 勾选协议复选框；找不到时只告警
    async fn check_agreements(&self, executor: &JsExecutor, row_number: u32) {
        if self.selectors.agreement_count == 0 {
            return;
        }
        let script = match form::check_agreements_script(
            &self.selectors.checkbox,
            self.selectors.agreement_count,
        ) {
            Ok(script) => script,
            Err(e) => {
                warn!("[行 {}] 生成复选框脚本失败: {}", row_number, e);
                return;
            }
        };

        match executor.eval_as::<AgreementReport>(script).await {
            Ok(report) if report.checked >= self.selectors.agreement_count => {
                debug!("[行 {}] ✓ 已勾选 {} 个协议复选框", row_number, report.checked);
            }
            Ok(report) => warn!(
                "[行 {}] 协议复选框不足 (需要 {}, 找到 {}, 已勾选 {})",
                row_number, self.selectors.agreement_count, report.found, report.checked
            ),
            Err(e) => warn!("[行 {}] 勾选复选框失败: {}，继续", row_number, e),
        }
    }
}

#[async_trait]
impl SubmissionDriver for BrowserDriver {
    async fn open(&self) -> Result<(), DriverError> {
        self.ensure_session().await
    }

    async fn close(&self) {
        self.shutdown_session().await;
    }

    async fn fill_one(
        &self,
        target: &str,
        record: &Record,
        mode: SubmitMode,
    ) -> Result<Outcome, DriverError> {
        let label = record.subject_label();

        let result = self
            .retry
            .run(
                move |attempt_no| self.attempt_once(target, record, mode, attempt_no),
                move || self.recycle_session(),
            )
            .await?;

        Ok(match result {
            RetryResult::Succeeded(detail) => Outcome::success(label, detail),
            RetryResult::Exhausted {
                last_error,
                attempts,
            } => {
                let session_lost = last_error.is_session_loss();
                Outcome::failure(label, format!("{} 次尝试后失败: {}", attempts, last_error))
                    .with_session_lost(session_lost)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordFields;

    fn record() -> Record {
        Record::new(
            1,
            RecordFields {
                email: "test@example.com".into(),
                first_name: "John".into(),
                last_name: "Doe".into(),
                phone: "5555551234".into(),
                date_of_birth: "01/15/1995".into(),
                zip_code: "12345".into(),
            },
        )
    }

    #[tokio::test]
    async fn close_without_open_is_safe() {
        let driver = BrowserDriver::new(&Config::default());
        driver.close().await;
        driver.close().await;
    }

    #[tokio::test]
    #[ignore] // 需要本机安装 Chromium：cargo test -- --ignored
    async fn fills_form_in_dry_run() {
        let config = Config::from_env();
        let driver = BrowserDriver::new(&config);
        driver.open().await.expect("启动浏览器失败");

        let outcome = driver
            .fill_one(&config.target_url, &record(), SubmitMode::DryRun)
            .await
            .expect("驱动不可用");
        driver.close().await;

        assert!(outcome.success, "{}", outcome.detail);
        assert_eq!(outcome.subject_label, "John Doe");
    }
}
