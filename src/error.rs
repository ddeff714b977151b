use thiserror::Error;

use crate::controller::JobStatus;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器驱动错误
    #[error("驱动错误: {0}")]
    Driver(#[from] DriverError),
    /// 任务控制错误
    #[error("控制错误: {0}")]
    Control(#[from] ControlError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 驱动错误
///
/// 单条记录的失败通常以 `Outcome` 返回，只有无法在记录内部恢复的情况才会以
/// 错误形式逃出 `fill_one`。
#[derive(Debug, Error)]
pub enum DriverError {
    /// 启动或连接浏览器失败
    #[error("浏览器启动失败: {detail}")]
    Launch { detail: String },
    /// 浏览器会话已断开
    #[error("浏览器会话丢失: {detail}")]
    SessionLost { detail: String },
    /// 导航失败
    #[error("导航到 {url} 失败: {detail}")]
    Navigation { url: String, detail: String },
    /// 表单字段不存在
    #[error("未找到字段 {field} (选择器: {selector})")]
    FieldNotFound { field: String, selector: String },
    /// 执行脚本失败
    #[error("执行脚本失败: {detail}")]
    Script { detail: String },
    /// 点击提交失败
    #[error("提交表单失败: {detail}")]
    Submit { detail: String },
    /// 步骤超时
    #[error("{stage} 超时 ({after_ms} ms)")]
    Timeout { stage: String, after_ms: u64 },
}

impl DriverError {
    /// 是否属于会话丢失
    pub fn is_session_loss(&self) -> bool {
        matches!(self, DriverError::SessionLost { .. })
    }

    /// 能否在单条记录范围内恢复
    ///
    /// 启动失败意味着驱动本身不可用，任务必须以 `error` 结束。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DriverError::Launch { .. })
    }

    /// 按错误文本归类：看起来像连接断开的归为会话丢失，其余使用 `fallback`
    pub fn classify(message: impl Into<String>, fallback: impl FnOnce(String) -> DriverError) -> Self {
        let detail = message.into();
        if looks_like_session_loss(&detail) {
            DriverError::SessionLost { detail }
        } else {
            fallback(detail)
        }
    }
}

/// 连接类故障的文本特征
pub fn looks_like_session_loss(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["browser", "closed", "disconnected", "websocket", "connection reset"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// 任务控制错误：请求的状态迁移不合法，任务状态保持不变
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("已有任务正在运行")]
    AlreadyRunning,
    #[error("当前状态为 {status}，无法执行 {action}")]
    InvalidTransition {
        action: &'static str,
        status: JobStatus,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("解析文件失败 ({path}): {detail}")]
    ParseFailed { path: String, detail: String },
    #[error("不支持的文件格式: {path}")]
    UnsupportedFormat { path: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("配置项 {key} 无效: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::classify(err.to_string(), |detail| DriverError::Script { detail })
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Script {
            detail: err.to_string(),
        }
    }
}

// ========== 便捷构造函数 ==========

impl FileError {
    pub fn parse_failed(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        FileError::ParseFailed {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
