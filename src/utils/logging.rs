/// 日志工具模块
///
/// 提供进度与统计信息的格式化输出
use tracing::{info, warn};

use crate::config::Config;
use crate::controller::{JobSnapshot, LogOutcome};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量表单提交");
    info!("🎯 目标地址: {}", config.target_url);
    info!("📄 记录文件: {}", config.records_file);
    if config.submit_live {
        warn!("⚠️ 实际提交模式：表单将被真正提交");
    } else {
        info!("🧪 演练模式：只填写不提交");
    }
    info!("{}", "=".repeat(60));
}

/// 输出操作说明
pub fn log_operator_help() {
    info!("💡 可输入命令: status | pause | resume | kill（Ctrl-C 等同 kill）");
}

/// 记录进度
pub fn log_progress(snapshot: &JobSnapshot) {
    info!(
        "📊 [{}] 进度 {}/{} | 成功 {} | 失败 {} | 已用时 {}s",
        snapshot.status,
        snapshot.position,
        snapshot.total,
        snapshot.completed_count,
        snapshot.failed_count,
        snapshot.elapsed_seconds
    );
}

/// 打印最终统计信息
pub fn print_final_stats(snapshot: &JobSnapshot, report_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 提交结束统计 ({})", snapshot.status);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", snapshot.completed_count, snapshot.total);
    info!("❌ 失败: {}", snapshot.failed_count);
    info!("📍 结束位置: {}", snapshot.position);

    for entry in snapshot
        .log
        .iter()
        .filter(|entry| entry.outcome == LogOutcome::Failed)
    {
        info!(
            "   行 {} ({}): {}",
            entry.row_number,
            entry.subject_label,
            truncate_text(entry.error_detail.as_deref().unwrap_or_default(), 80)
        );
    }
    for fatal in snapshot.errors.iter().filter(|e| e.starts_with("致命错误")) {
        warn!("   {}", fatal);
    }

    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", report_file);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_text("浏览器会话丢失", 3), "浏览器...");
        assert_eq!(truncate_text("short", 10), "short");
    }
}
