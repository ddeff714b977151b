//! 浏览器会话
//!
//! 会话要么由本进程启动（关闭时结束浏览器进程），要么连接到外部浏览器
//! （关闭时只断开连接）。

mod connection;
mod headless;

pub use connection::connect_to_browser;
pub use headless::launch_browser;

use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DriverError;

/// 一个可复用的浏览器会话
pub struct BrowserSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    owns_process: bool,
}

impl BrowserSession {
    fn new(browser: Browser, handler_task: JoinHandle<()>, owns_process: bool) -> Self {
        Self {
            browser,
            handler_task,
            owns_process,
        }
    }

    /// 按配置启动或连接浏览器
    pub async fn establish(config: &Config) -> Result<Self, DriverError> {
        match config.browser_debug_port {
            Some(port) => connect_to_browser(port).await,
            None => launch_browser(config).await,
        }
    }

    /// 事件循环退出即认为连接已断开
    pub fn is_alive(&self) -> bool {
        !self.handler_task.is_finished()
    }

    pub async fn new_page(&self) -> Result<Page, DriverError> {
        self.browser.new_page("about:blank").await.map_err(|e| {
            DriverError::classify(e.to_string(), |detail| DriverError::SessionLost {
                detail: format!("创建页面失败: {}", detail),
            })
        })
    }

    pub async fn shutdown(mut self) {
        if self.owns_process {
            if let Err(e) = self.browser.close().await {
                warn!("关闭浏览器失败: {}", e);
            }
            if let Err(e) = self.browser.wait().await {
                debug!("等待浏览器进程退出失败: {}", e);
            }
        }
        self.handler_task.abort();
        info!("浏览器会话已关闭");
    }
}
