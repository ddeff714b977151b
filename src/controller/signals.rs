//! 控制信号
//!
//! 暂停信号每个执行轮次一个，`resume` 时换新；停止信号整个任务共用，一经触发不再清除。

use tokio_util::sync::CancellationToken;

/// 执行循环在检查点观察到的中止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Stop,
    Pause,
}

#[derive(Debug, Clone, Default)]
pub struct JobSignals {
    pause: CancellationToken,
    stop: CancellationToken,
}

impl JobSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.pause.cancel();
    }

    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn pause_requested(&self) -> bool {
        self.pause.is_cancelled()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// 下一轮执行使用的信号：暂停已清除，停止沿用
    pub fn next_episode(&self) -> Self {
        Self {
            pause: CancellationToken::new(),
            stop: self.stop.clone(),
        }
    }

    /// 停止优先于暂停
    pub fn checkpoint(&self) -> Option<Halt> {
        if self.stop_requested() {
            Some(Halt::Stop)
        } else if self.pause_requested() {
            Some(Halt::Pause)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_wins_over_pause() {
        let signals = JobSignals::new();
        assert_eq!(signals.checkpoint(), None);
        signals.request_pause();
        assert_eq!(signals.checkpoint(), Some(Halt::Pause));
        signals.request_stop();
        assert_eq!(signals.checkpoint(), Some(Halt::Stop));
    }

    #[test]
    fn next_episode_clears_pause_only() {
        let signals = JobSignals::new();
        signals.request_pause();
        let resumed = signals.next_episode();
        assert!(!resumed.pause_requested());
        // 旧轮次仍然看到暂停
        assert!(signals.pause_requested());

        resumed.request_stop();
        assert!(signals.stop_requested());
    }
}
