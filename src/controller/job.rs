//! 任务状态与快照

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::time::Instant;

use crate::driver::{Outcome, SubmitMode};
use crate::models::Record;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Killed,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Killed => "killed",
            JobStatus::Error => "error",
        }
    }

    /// 没有新的 `start` 就不会再变化的状态
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Killed | JobStatus::Error
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutcome {
    Success,
    Failed,
}

/// 单条记录的处理日志
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub row_number: u32,
    pub outcome: LogOutcome,
    pub subject_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Local>,
}

/// 控制器内部的任务状态，只在锁内读写
#[derive(Debug, Default)]
pub(crate) struct Job {
    pub status: JobStatus,
    pub target: String,
    pub mode: SubmitMode,
    pub records: Arc<Vec<Record>>,
    pub position: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub started_at: Option<Instant>,
    pub started_at_wall: Option<DateTime<Local>>,
    /// 离开 running 时冻结的耗时
    elapsed: Duration,
    pub log: Vec<LogEntry>,
    pub errors: Vec<String>,
}

impl Job {
    pub fn start(target: String, records: Vec<Record>, mode: SubmitMode) -> Self {
        Self {
            status: JobStatus::Running,
            target,
            mode,
            records: Arc::new(records),
            started_at: Some(Instant::now()),
            started_at_wall: Some(Local::now()),
            ..Self::default()
        }
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// 状态迁移；离开 running 时冻结耗时
    pub fn transition(&mut self, to: JobStatus) {
        if self.status == JobStatus::Running && to != JobStatus::Running {
            if let Some(started_at) = self.started_at {
                self.elapsed = started_at.elapsed();
            }
        }
        self.status = to;
    }

    pub fn elapsed(&self) -> Duration {
        match (self.status, self.started_at) {
            (JobStatus::Running, Some(started_at)) => started_at.elapsed(),
            _ => self.elapsed,
        }
    }

    /// 记录一条结果并前进一位；计数、日志与位置在同一次加锁内一起更新
    pub fn record_outcome(&mut self, row_number: u32, outcome: Outcome) {
        let entry = if outcome.success {
            self.completed_count += 1;
            LogEntry {
                row_number,
                outcome: LogOutcome::Success,
                subject_label: outcome.subject_label,
                error_detail: None,
                timestamp: Local::now(),
            }
        } else {
            self.failed_count += 1;
            self.errors
                .push(format!("[行 {}] {}", row_number, outcome.detail));
            LogEntry {
                row_number,
                outcome: LogOutcome::Failed,
                subject_label: outcome.subject_label,
                error_detail: Some(outcome.detail),
                timestamp: Local::now(),
            }
        };
        self.log.push(entry);
        self.position += 1;
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.total()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            status: self.status,
            position: self.position,
            total: self.total(),
            completed_count: self.completed_count,
            failed_count: self.failed_count,
            elapsed_seconds: self.elapsed().as_secs(),
            started_at: self.started_at_wall,
            log: self.log.clone(),
            errors: self.errors.clone(),
        }
    }
}

/// `status()` 返回的不可变快照
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub position: usize,
    pub total: usize,
    pub completed_count: usize,
    pub failed_count: usize,
    pub elapsed_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Local>>,
    pub log: Vec<LogEntry>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartReceipt {
    pub status: &'static str,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PauseReceipt {
    pub status: JobStatus,
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeReceipt {
    pub status: JobStatus,
    pub resumed_from: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KillReceipt {
    pub status: JobStatus,
    pub final_position: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordFields;

    fn records(n: u32) -> Vec<Record> {
        (1..=n)
            .map(|row| {
                Record::new(
                    row,
                    RecordFields {
                        email: format!("user{}@example.com", row),
                        first_name: format!("First{}", row),
                        last_name: "Last".into(),
                        phone: "5555551234".into(),
                        date_of_birth: "01/15/2000".into(),
                        zip_code: "12345".into(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn outcomes_advance_position_with_counters() {
        let mut job = Job::start("https://example.com".into(), records(2), SubmitMode::DryRun);
        job.record_outcome(1, Outcome::success("First1 Last", "ok"));
        job.record_outcome(2, Outcome::failure("First2 Last", "field missing"));

        assert_eq!(job.position, 2);
        assert_eq!(job.completed_count + job.failed_count, job.position);
        assert_eq!(job.errors, vec!["[行 2] field missing".to_string()]);
        assert_eq!(job.log[1].error_detail.as_deref(), Some("field missing"));
        assert!(job.is_exhausted());
    }

    #[test]
    fn elapsed_freezes_when_leaving_running() {
        let mut job = Job::start("https://example.com".into(), records(1), SubmitMode::DryRun);
        job.transition(JobStatus::Paused);
        let frozen = job.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(job.elapsed(), frozen);
    }

    #[test]
    fn snapshot_serializes_with_camel_case_keys() {
        let job = Job::start("https://example.com".into(), records(3), SubmitMode::DryRun);
        let value = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(value["status"], "running");
        assert_eq!(value["total"], 3);
        assert_eq!(value["completedCount"], 0);
        assert!(value.get("elapsedSeconds").is_some());
    }

    #[test]
    fn receipts_use_external_key_names() {
        let value = serde_json::to_value(KillReceipt {
            status: JobStatus::Killed,
            final_position: 4,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "status": "killed", "finalPosition": 4 }));
    }
}
