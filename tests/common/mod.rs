#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use form_batch_submit::{
    DriverError, JobController, JobSnapshot, Outcome, Record, RecordFields, SubmissionDriver,
    SubmitMode,
};
use tokio::sync::Semaphore;

/// 按行号预设结果的内存驱动
#[derive(Default)]
pub struct ScriptedDriver {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    /// 进入 `fill_one` 的次数（在等待许可之前计数）
    entered: AtomicUsize,
    calls: Mutex<Vec<u32>>,
    failing_rows: HashSet<u32>,
    session_lost_rows: HashSet<u32>,
    escaping_rows: HashSet<u32>,
    fatal_rows: HashSet<u32>,
    open_fails: bool,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次 `fill_one` 需要先拿到一个许可
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing(mut self, row: u32) -> Self {
        self.failing_rows.insert(row);
        self
    }

    pub fn losing_session(mut self, row: u32) -> Self {
        self.session_lost_rows.insert(row);
        self
    }

    /// 以 `Err(SessionLost)` 逃出驱动
    pub fn escaping(mut self, row: u32) -> Self {
        self.escaping_rows.insert(row);
        self
    }

    pub fn fatal(mut self, row: u32) -> Self {
        self.fatal_rows.insert(row);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionDriver for ScriptedDriver {
    async fn open(&self) -> Result<(), DriverError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_fails {
            return Err(DriverError::Launch {
                detail: "chrome not found".into(),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    async fn fill_one(
        &self,
        _target: &str,
        record: &Record,
        _mode: SubmitMode,
    ) -> Result<Outcome, DriverError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        let row = record.row_number;
        self.calls.lock().unwrap().push(row);
        let label = record.subject_label();

        if self.fatal_rows.contains(&row) {
            return Err(DriverError::Launch {
                detail: "browser binary vanished".into(),
            });
        }
        if self.escaping_rows.contains(&row) {
            return Err(DriverError::SessionLost {
                detail: "browser disconnected".into(),
            });
        }
        if self.session_lost_rows.contains(&row) {
            return Ok(Outcome::failure(label, "3 次尝试后失败: target closed").with_session_lost(true));
        }
        if self.failing_rows.contains(&row) {
            return Ok(Outcome::failure(label, "未找到字段 zip_code"));
        }
        Ok(Outcome::success(label, "表单已填写"))
    }
}

pub const TARGET: &str = "https://forms.example.com/info";

pub fn records(n: u32) -> Vec<Record> {
    (1..=n)
        .map(|row| {
            Record::new(
                row,
                RecordFields {
                    email: format!("student{}@example.com", row),
                    first_name: format!("Student{}", row),
                    last_name: "Doe".into(),
                    phone: "5555551234".into(),
                    date_of_birth: "01/15/2000".into(),
                    zip_code: "12345".into(),
                },
            )
        })
        .collect()
}

pub fn controller(driver: Arc<ScriptedDriver>) -> JobController {
    JobController::with_record_delay(driver, Duration::from_millis(2))
}

/// 轮询快照直到满足条件，超时则失败
pub async fn wait_for(
    controller: &JobController,
    what: &str,
    predicate: impl Fn(&JobSnapshot) -> bool,
) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = controller.status().await;
        if predicate(&snapshot) {
            return snapshot;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("等待超时: {} (最后状态: {:?})", what, snapshot);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// 等待驱动调用次数达到 `count`，用于确认某条记录正在处理中
pub async fn wait_entered(driver: &ScriptedDriver, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while driver.entered() < count {
        if tokio::time::Instant::now() >= deadline {
            panic!("驱动调用次数未达到 {}", count);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub async fn wait_settled(controller: &JobController) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !controller.is_settled().await {
        if tokio::time::Instant::now() >= deadline {
            panic!("后台任务未退出");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub fn rows(snapshot: &JobSnapshot) -> Vec<u32> {
    snapshot.log.iter().map(|entry| entry.row_number).collect()
}
