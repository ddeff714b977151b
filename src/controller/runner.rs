//! 执行循环
//!
//! 每个执行轮次一个 tokio 任务。循环只在检查点（每条记录开始前）观察控制信号，
//! 驱动调用进行中不会被打断。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::controller::job::JobStatus;
use crate::controller::signals::{Halt, JobSignals};
use crate::controller::ControllerState;
use crate::driver::{Outcome, SubmissionDriver, SubmitMode};
use crate::models::Record;

/// 保证一个任务只关闭一次驱动会话
#[derive(Clone)]
pub(crate) struct DriverRelease {
    released: Arc<AtomicBool>,
    driver: Arc<dyn SubmissionDriver>,
}

impl DriverRelease {
    pub fn new(driver: Arc<dyn SubmissionDriver>) -> Self {
        Self {
            released: Arc::new(AtomicBool::new(false)),
            driver,
        }
    }

    pub async fn release(&self) {
        if !self.released.swap(true, Ordering::SeqCst) {
            self.driver.close().await;
        }
    }
}

enum Step {
    Process {
        record: Record,
        target: String,
        mode: SubmitMode,
    },
    Halted,
    Finished,
}

pub(crate) struct JobRunner {
    pub shared: Arc<Mutex<ControllerState>>,
    pub driver: Arc<dyn SubmissionDriver>,
    pub signals: JobSignals,
    pub job_id: u64,
    pub record_delay: Duration,
    pub release: DriverRelease,
    /// 上一轮执行任务，本轮开始前等待其退出
    pub previous: Option<JoinHandle<()>>,
}

impl JobRunner {
    pub async fn run(mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = previous.await {
                warn!("上一轮执行任务异常退出: {}", e);
            }
        }

        // 等待期间可能已被暂停或终止
        if let Some(halt) = self.signals.checkpoint() {
            info!("执行轮次开始前收到 {:?} 信号，直接退出", halt);
            return;
        }

        // 上一轮可能已处理完最后一条记录并结束任务，此时会话已释放，不能再打开
        if !self.still_running().await {
            info!("任务已不在运行状态，执行轮次直接退出");
            return;
        }

        if let Err(e) = self.driver.open().await {
            error!("驱动初始化失败: {}", e);
            self.fail(format!("致命错误: 驱动初始化失败: {}", e)).await;
            return;
        }

        loop {
            let (record, target, mode) = match self.next_step().await {
                Step::Process {
                    record,
                    target,
                    mode,
                } => (record, target, mode),
                Step::Halted => return,
                Step::Finished => {
                    self.finish().await;
                    return;
                }
            };

            let row_number = record.row_number;
            let label = record.subject_label();
            info!("[行 {}] 处理中: {}", row_number, label);

            let (outcome, session_lost) = match self.driver.fill_one(&target, &record, mode).await {
                Ok(outcome) => {
                    let session_lost = !outcome.success && outcome.session_lost;
                    (outcome, session_lost)
                }
                Err(e) if e.is_recoverable() => {
                    (Outcome::failure(label.clone(), e.to_string()), e.is_session_loss())
                }
                Err(e) => {
                    error!("[行 {}] 不可恢复的错误: {}", row_number, e);
                    self.fail(format!("致命错误: [行 {}] {}", row_number, e))
                        .await;
                    return;
                }
            };

            if outcome.success {
                info!("[行 {}] ✓ 成功 - {}", row_number, label);
            } else {
                error!("[行 {}] ✗ 失败 - {} - {}", row_number, label, outcome.detail);
            }

            let finished = match self.apply(row_number, outcome).await {
                Some(finished) => finished,
                None => return,
            };

            if session_lost {
                self.recover_session().await;
            }

            if finished {
                self.finish().await;
                return;
            }

            // 给远端页面留出稳定时间
            sleep(self.record_delay).await;
        }
    }

    /// 本轮所属任务仍是当前任务且处于 running
    ///
    /// 驱动会话只会在任务离开 running 时释放，因此这里为真时会话尚未关闭。
    async fn still_running(&self) -> bool {
        let state = self.shared.lock().await;
        state.job_id == self.job_id && state.job.status == JobStatus::Running
    }

    /// 检查点：观察控制信号并取出下一条记录
    async fn next_step(&self) -> Step {
        let state = self.shared.lock().await;
        if state.job_id != self.job_id {
            return Step::Halted;
        }

        match self.signals.checkpoint() {
            Some(Halt::Stop) => {
                info!("检测到终止信号，停止执行 (位置 {})", state.job.position);
                return Step::Halted;
            }
            Some(Halt::Pause) => {
                info!("检测到暂停信号，暂停执行 (位置 {})", state.job.position);
                return Step::Halted;
            }
            None => {}
        }

        let job = &state.job;
        match job.records.get(job.position) {
            Some(record) => Step::Process {
                record: record.clone(),
                target: job.target.clone(),
                mode: job.mode,
            },
            None => Step::Finished,
        }
    }

    /// 写入一条结果；任务已被新任务取代时返回 `None`
    async fn apply(&self, row_number: u32, outcome: Outcome) -> Option<bool> {
        let mut state = self.shared.lock().await;
        if state.job_id != self.job_id {
            warn!("[行 {}] 任务已被替换，丢弃本条结果", row_number);
            return None;
        }
        state.job.record_outcome(row_number, outcome);
        Some(state.job.is_exhausted())
    }

    /// 会话丢失：关闭并重新打开驱动会话，本条记录仍计为失败
    async fn recover_session(&self) {
        warn!("浏览器会话丢失，正在重启...");
        self.driver.close().await;
        match self.driver.open().await {
            Ok(()) => info!("浏览器重启成功"),
            Err(e) => error!("浏览器重启失败: {}", e),
        }
    }

    async fn finish(&self) {
        {
            let mut state = self.shared.lock().await;
            if state.job_id != self.job_id {
                return;
            }
            let job = &mut state.job;
            if matches!(job.status, JobStatus::Running | JobStatus::Paused) {
                job.transition(JobStatus::Completed);
            }
            info!(
                "提交完成: 成功 {}, 失败 {}, 共 {}",
                job.completed_count,
                job.failed_count,
                job.total()
            );
        }
        self.release.release().await;
    }

    async fn fail(&self, detail: String) {
        {
            let mut state = self.shared.lock().await;
            if state.job_id != self.job_id {
                return;
            }
            let job = &mut state.job;
            job.errors.push(detail);
            if job.status != JobStatus::Killed {
                job.transition(JobStatus::Error);
            }
        }
        self.release.release().await;
    }
}
