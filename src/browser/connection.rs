use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::BrowserSession;
use crate::error::DriverError;

/// 连接到已在调试端口上运行的浏览器
///
/// 关闭会话时只断开连接，不会关闭对方的浏览器进程。
pub async fn connect_to_browser(port: u16) -> Result<BrowserSession, DriverError> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        DriverError::Launch {
            detail: format!("无法连接到浏览器 (端口: {}): {}", port, e),
        }
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    Ok(BrowserSession::new(browser, handler_task, false))
}
