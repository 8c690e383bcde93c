//! 重连策略

use std::time::Duration;

/// 默认重连延迟
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// 退避上限默认值
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// 重连策略
///
/// 默认每 3 秒重试一次，不设次数上限
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// 首次重连延迟
    pub delay: Duration,
    /// 每次失败后的延迟倍数，1.0 表示固定延迟
    pub multiplier: f64,
    /// 延迟上限
    pub max_delay: Duration,
    /// 连续重连次数上限，`None` 表示无限
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// 固定延迟、无限重试
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            multiplier: 1.0,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, multiplier: f64, max_delay: Duration) -> Self {
        self.multiplier = multiplier.max(1.0);
        self.max_delay = max_delay;
        self
    }

    /// 第 `attempt` 次重连 (从 1 开始) 前的等待时间
    ///
    /// 超过次数上限时返回 `None`
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let millis = self.delay.as_millis() as f64 * self.multiplier.max(1.0).powi(exponent);
        let cap = self.max_delay.max(self.delay);
        let capped = millis.min(cap.as_millis() as f64);

        Some(Duration::from_millis(capped as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_fixed_and_unbounded() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_for(10), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_for(100_000), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_max_attempts_cutoff() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(500)).with_max_attempts(2);
        assert!(policy.delay_for(1).is_some());
        assert!(policy.delay_for(2).is_some());
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(1000))
            .with_backoff(2.0, Duration::from_millis(5000));
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(2000)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(4000)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(5000)));
        assert_eq!(policy.delay_for(u32::MAX), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_multiplier_below_one_is_clamped() {
        let policy = ReconnectPolicy::fixed(Duration::from_millis(1000))
            .with_backoff(0.5, Duration::from_millis(5000));
        assert_eq!(policy.multiplier, 1.0);
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(1000)));
    }
}
