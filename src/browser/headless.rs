use std::path::Path;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::BrowserSession;
use crate::config::Config;
use crate::error::DriverError;

/// 启动浏览器（默认无头）
pub async fn launch_browser(config: &Config) -> Result<BrowserSession, DriverError> {
    info!("🚀 启动浏览器 (headless: {})...", config.headless);

    let mut builder = BrowserConfig::builder()
        .request_timeout(config.navigation_timeout())
        .args(vec![
            "--disable-gpu",           // 无头模式下禁用 GPU
            "--no-sandbox",            // 容器内运行需要关闭沙盒
            "--disable-dev-shm-usage", // 防止共享内存不足
        ]);

    builder = if config.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };

    if let Some(executable) = &config.chrome_executable {
        debug!("使用浏览器可执行文件: {}", executable);
        builder = builder.chrome_executable(Path::new(executable));
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        DriverError::Launch {
            detail: format!("配置浏览器失败: {}", e),
        }
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        DriverError::Launch {
            detail: e.to_string(),
        }
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    info!("✅ 浏览器已就绪");
    Ok(BrowserSession::new(browser, handler_task, true))
}
