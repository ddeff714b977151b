use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::job::{
    Job, JobSnapshot, JobStatus, KillReceipt, PauseReceipt, ResumeReceipt, StartReceipt,
};
use crate::controller::runner::{DriverRelease, JobRunner};
use crate::controller::signals::JobSignals;
use crate::driver::{SubmissionDriver, SubmitMode};
use crate::error::ControlError;
use crate::models::Record;

/// 锁内共享的控制器状态
#[derive(Default)]
pub(crate) struct ControllerState {
    pub job: Job,
    /// 每次 `start` 递增，旧任务的执行循环据此识别自己已被取代
    pub job_id: u64,
    pub signals: JobSignals,
    pub release: Option<DriverRelease>,
    /// 最近一次派生的后台任务（执行循环或终止后的清理任务）
    pub worker: Option<JoinHandle<()>>,
}

/// 批量提交任务控制器
///
/// 每个进程构造一个实例并注入给外层接口；同一时间只有一个任务。
pub struct JobController {
    driver: Arc<dyn SubmissionDriver>,
    shared: Arc<Mutex<ControllerState>>,
    record_delay: Duration,
}

impl JobController {
    pub fn new(driver: Arc<dyn SubmissionDriver>, config: &Config) -> Self {
        Self::with_record_delay(driver, config.record_delay())
    }

    pub fn with_record_delay(driver: Arc<dyn SubmissionDriver>, record_delay: Duration) -> Self {
        Self {
            driver,
            shared: Arc::new(Mutex::new(ControllerState::default())),
            record_delay,
        }
    }

    /// 开始新任务；已有任务在运行时拒绝
    pub async fn start(
        &self,
        target: impl Into<String>,
        records: Vec<Record>,
        mode: SubmitMode,
    ) -> Result<StartReceipt, ControlError> {
        let mut state = self.shared.lock().await;
        if state.job.status == JobStatus::Running {
            return Err(ControlError::AlreadyRunning);
        }

        // 让可能仍在进行中的旧执行循环在下一个检查点退出
        state.signals.request_stop();

        let total = records.len();
        state.job_id += 1;
        state.job = Job::start(target.into(), records, mode);
        state.signals = JobSignals::new();
        // 被取代的任务先退出并关闭自己的会话，新任务才会打开驱动
        let previous = reap(state.worker.take(), state.release.take());
        let release = DriverRelease::new(self.driver.clone());
        state.release = Some(release.clone());

        let runner = JobRunner {
            shared: self.shared.clone(),
            driver: self.driver.clone(),
            signals: state.signals.clone(),
            job_id: state.job_id,
            record_delay: self.record_delay,
            release,
            previous: Some(previous),
        };
        state.worker = Some(tokio::spawn(runner.run()));

        info!(
            "开始提交: {} 条记录 -> {} ({:?})",
            total, state.job.target, mode
        );

        Ok(StartReceipt {
            status: "started",
            total,
        })
    }

    /// 暂停：当前记录处理完后不再前进
    pub async fn pause(&self) -> Result<PauseReceipt, ControlError> {
        let mut state = self.shared.lock().await;
        if state.job.status != JobStatus::Running {
            return Err(ControlError::InvalidTransition {
                action: "pause",
                status: state.job.status,
            });
        }

        state.signals.request_pause();
        state.job.transition(JobStatus::Paused);
        info!("暂停提交，位置 {}", state.job.position);

        Ok(PauseReceipt {
            status: JobStatus::Paused,
            position: state.job.position,
        })
    }

    /// 从暂停位置继续
    pub async fn resume(&self) -> Result<ResumeReceipt, ControlError> {
        let mut state = self.shared.lock().await;
        if state.job.status != JobStatus::Paused {
            return Err(ControlError::InvalidTransition {
                action: "resume",
                status: state.job.status,
            });
        }

        state.signals = state.signals.next_episode();
        state.job.transition(JobStatus::Running);

        let release = state
            .release
            .clone()
            .unwrap_or_else(|| DriverRelease::new(self.driver.clone()));
        let runner = JobRunner {
            shared: self.shared.clone(),
            driver: self.driver.clone(),
            signals: state.signals.clone(),
            job_id: state.job_id,
            record_delay: self.record_delay,
            release,
            previous: state.worker.take(),
        };
        state.worker = Some(tokio::spawn(runner.run()));

        info!("从位置 {} 继续提交", state.job.position);

        Ok(ResumeReceipt {
            status: JobStatus::Running,
            resumed_from: state.job.position,
        })
    }

    /// 终止任务：不可恢复，驱动会话在执行循环退出后关闭
    pub async fn kill(&self) -> Result<KillReceipt, ControlError> {
        let mut state = self.shared.lock().await;
        if state.job.status == JobStatus::Idle {
            return Err(ControlError::InvalidTransition {
                action: "kill",
                status: JobStatus::Idle,
            });
        }

        let final_position = state.job.position;
        state.signals.request_stop();
        state.job.transition(JobStatus::Killed);

        let previous = state.worker.take();
        state.worker = Some(reap(previous, state.release.clone()));

        info!("终止提交，位置 {}", final_position);

        Ok(KillReceipt {
            status: JobStatus::Killed,
            final_position,
        })
    }

    /// 当前任务快照，不会等待驱动调用
    pub async fn status(&self) -> JobSnapshot {
        self.shared.lock().await.job.snapshot()
    }

    /// 后台任务是否都已退出（包括终止后的会话清理）
    pub async fn is_settled(&self) -> bool {
        self.shared
            .lock()
            .await
            .worker
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }
}

/// 等待执行循环退出后释放该任务的驱动会话
fn reap(previous: Option<JoinHandle<()>>, release: Option<DriverRelease>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(previous) = previous {
            if let Err(e) = previous.await {
                warn!("执行任务异常退出: {}", e);
            }
        }
        if let Some(release) = release {
            release.release().await;
        }
    })
}
