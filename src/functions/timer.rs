//! 定时清理：按固定间隔触发（默认 5 分钟），记录 UTC 时间，落后于计划时告警

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// 实际触发晚于计划超过该值视为 past due
pub const PAST_DUE_TOLERANCE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub struct TimerTick {
    pub fired_at: DateTime<Utc>,
    pub past_due: bool,
}

pub fn is_past_due(scheduled: Instant, now: Instant) -> bool {
    now.saturating_duration_since(scheduled) > PAST_DUE_TOLERANCE
}

/// 单次清理；周期性维护任务挂在这里
pub fn timer_cleanup(past_due: bool) -> TimerTick {
    let fired_at = Utc::now();
    if past_due {
        tracing::warn!("Timer is past due!");
    }
    tracing::info!(at = %fired_at.to_rfc3339(), "Timer triggered");
    TimerTick { fired_at, past_due }
}

/// 后台定时任务；取消后退出并返回已触发次数
pub fn spawn_timer_cleanup(period: Duration, cancel: CancellationToken) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(ticks, "timer cleanup stopped");
                    break;
                }
                scheduled = timer.tick() => {
                    timer_cleanup(is_past_due(scheduled, Instant::now()));
                    ticks += 1;
                }
            }
        }
        ticks
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_past_due_threshold() {
        let scheduled = Instant::now();
        assert!(!is_past_due(scheduled, scheduled));
        assert!(!is_past_due(scheduled, scheduled + Duration::from_millis(500)));
        assert!(is_past_due(scheduled, scheduled + Duration::from_secs(5)));
        // 提前触发不算
        assert!(!is_past_due(scheduled + Duration::from_secs(5), scheduled));
    }

    #[test]
    fn test_cleanup_reports_tick() {
        let before = Utc::now();
        let tick = timer_cleanup(true);
        assert!(tick.past_due);
        assert!(tick.fired_at >= before);
    }

    #[tokio::test]
    async fn test_spawned_timer_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let handle = spawn_timer_cleanup(Duration::from_millis(20), cancel.clone());
        tokio::time::sleep(Duration::from_millis(110)).await;
        cancel.cancel();
        let ticks = handle.await.unwrap();
        assert!(ticks >= 1);
    }
}
