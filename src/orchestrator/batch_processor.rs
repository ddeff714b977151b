//! 批量提交入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：构造浏览器驱动与任务控制器
//! 2. **加载记录**：读取已清洗的记录文件
//! 3. **启动任务**：按配置选择演练或实际提交
//! 4. **操作员控制**：从标准输入读取 status / pause / resume / kill
//! 5. **结束汇总**：输出统计并写入 JSON 报告

use crate::config::Config;
use crate::controller::{JobController, JobSnapshot};
use crate::driver::{BrowserDriver, SubmissionDriver, SubmitMode};
use crate::error::FileError;
use crate::models::load_records;
use crate::orchestrator::operator::OperatorCommand;
use crate::utils::logging::{log_operator_help, log_progress, log_startup, print_final_stats};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    controller: Arc<JobController>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        log_startup(&config);

        let driver: Arc<dyn SubmissionDriver> = Arc::new(BrowserDriver::new(&config));
        let controller = Arc::new(JobController::new(driver, &config));

        Ok(Self { config, controller })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        info!("\n📁 正在加载记录...");
        let records = load_records(Path::new(&self.config.records_file)).await?;

        if records.is_empty() {
            warn!("⚠️ 记录文件为空，程序结束");
            return Ok(());
        }

        let receipt = self
            .controller
            .start(
                self.config.target_url.clone(),
                records,
                SubmitMode::from_live_flag(self.config.submit_live),
            )
            .await?;
        info!("✓ 任务已启动，共 {} 条记录", receipt.total);
        log_operator_help();

        let snapshot = self.supervise().await?;

        self.write_report(&snapshot).await?;
        print_final_stats(&snapshot, &self.config.report_file);

        Ok(())
    }

    /// 处理操作员命令并定期输出进度，直到任务结束
    async fn supervise(&self) -> Result<JobSnapshot> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdin_open = true;
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.status_interval_secs.max(1)));
        let mut settle_check = tokio::time::interval(Duration::from_millis(250));

        loop {
            tokio::select! {
                line = lines.next_line(), if stdin_open => match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => self.handle_command(&line).await,
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("读取标准输入失败: {}", e);
                        stdin_open = false;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    warn!("收到 Ctrl-C，终止任务");
                    if let Err(e) = self.controller.kill().await {
                        warn!("{}", e);
                    }
                }
                _ = ticker.tick() => {
                    log_progress(&self.controller.status().await);
                }
                _ = settle_check.tick() => {
                    let snapshot = self.controller.status().await;
                    if snapshot.status.is_terminal() && self.controller.is_settled().await {
                        return Ok(snapshot);
                    }
                }
            }
        }
    }

    async fn handle_command(&self, line: &str) {
        let command = match line.parse::<OperatorCommand>() {
            Ok(command) => command,
            Err(e) => {
                warn!("{}", e);
                log_operator_help();
                return;
            }
        };

        let result = match command {
            OperatorCommand::Status => {
                log_progress(&self.controller.status().await);
                Ok(())
            }
            OperatorCommand::Pause => self
                .controller
                .pause()
                .await
                .map(|r| info!("⏸️ 已暂停，位置 {}", r.position)),
            OperatorCommand::Resume => self
                .controller
                .resume()
                .await
                .map(|r| info!("▶️ 已从位置 {} 继续", r.resumed_from)),
            OperatorCommand::Kill => self
                .controller
                .kill()
                .await
                .map(|r| info!("⏹️ 已终止，结束位置 {}", r.final_position)),
        };

        if let Err(e) = result {
            warn!("⚠️ {}", e);
        }
    }

    async fn write_report(&self, snapshot: &JobSnapshot) -> Result<()> {
        let path = &self.config.report_file;
        let content = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|source| FileError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        Ok(())
    }
}
