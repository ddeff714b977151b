use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 目标表单 URL
    pub target_url: String,
    /// 待提交记录文件（TOML 或 JSON）
    pub records_file: String,
    /// 任务结束后写入的状态报告
    pub report_file: String,
    /// 是否真正点击提交按钮（false 为演练模式）
    pub submit_live: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 浏览器配置 ---
    /// 设置后连接已有浏览器的调试端口，否则自行启动无头浏览器
    pub browser_debug_port: Option<u16>,
    pub headless: bool,
    pub chrome_executable: Option<String>,
    pub navigation_timeout_ms: u64,
    /// 字段填写完成后等待页面处理的时间
    pub settle_delay_ms: u64,
    // --- 重试与节奏 ---
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    /// 两条记录之间的固定间隔
    pub record_delay_ms: u64,
    /// 进度日志输出间隔
    pub status_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_url: "https://www.goarmy.com/info".to_string(),
            records_file: "records.toml".to_string(),
            report_file: "submission_report.json".to_string(),
            submit_live: false,
            verbose_logging: false,
            browser_debug_port: None,
            headless: true,
            chrome_executable: None,
            navigation_timeout_ms: 30_000,
            settle_delay_ms: 1_000,
            max_attempts: 3,
            retry_delay_ms: 2_000,
            record_delay_ms: 200,
            status_interval_secs: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            target_url: std::env::var("TARGET_URL").unwrap_or(default.target_url),
            records_file: std::env::var("RECORDS_FILE").unwrap_or(default.records_file),
            report_file: std::env::var("REPORT_FILE").unwrap_or(default.report_file),
            submit_live: std::env::var("SUBMIT_LIVE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.submit_live),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).or(default.browser_debug_port),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            chrome_executable: std::env::var("CHROME_EXECUTABLE").ok().or(default.chrome_executable),
            navigation_timeout_ms: std::env::var("NAVIGATION_TIMEOUT_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.navigation_timeout_ms),
            settle_delay_ms: std::env::var("SETTLE_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_delay_ms),
            max_attempts: std::env::var("MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_attempts),
            retry_delay_ms: std::env::var("RETRY_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_delay_ms),
            record_delay_ms: std::env::var("RECORD_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.record_delay_ms),
            status_interval_secs: std::env::var("STATUS_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.status_interval_secs),
        }
    }

    /// 检查启动任务前必须满足的配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_url.starts_with("http://") || self.target_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "TARGET_URL",
                reason: format!("需要 http(s) 地址，实际为 '{}'", self.target_url),
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_ATTEMPTS",
                reason: "至少需要 1 次尝试".to_string(),
            });
        }
        if self.records_file.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "RECORDS_FILE",
                reason: "不能为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn record_delay(&self) -> Duration {
        Duration::from_millis(self.record_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
