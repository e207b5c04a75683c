//! 接続ごとのレート制限（固定長ウィンドウのカウンター）

use super::value_object::Timestamp;

/// デフォルトのウィンドウ長（ミリ秒）
pub const DEFAULT_WINDOW_MILLIS: i64 = 10_000;

/// デフォルトのウィンドウ内の上限イベント数
pub const DEFAULT_MAX_EVENTS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub window_millis: i64,
    pub max_events: u32,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_millis: DEFAULT_WINDOW_MILLIS,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Throttled,
}

/// レート制限ウィンドウ
///
/// ウィンドウ開始からの経過がウィンドウ長以上になればリセットされる。
/// ウィンドウ内でカウントが上限を超えたイベントは拒否される（キューには積まない）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitWindow {
    count: u32,
    window_start: Timestamp,
}

impl RateLimitWindow {
    /// 最初のイベントでウィンドウを開始する（カウント 1）
    pub fn start(now: Timestamp) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_start(&self) -> Timestamp {
        self.window_start
    }

    /// イベントを 1 件数えて判定する
    pub fn hit(&mut self, now: Timestamp, policy: &RateLimitPolicy) -> RateLimitDecision {
        if now.millis_since(self.window_start) >= policy.window_millis {
            *self = Self::start(now);
            return RateLimitDecision::Allowed;
        }

        self.count = self.count.saturating_add(1);
        if self.count > policy.max_events {
            RateLimitDecision::Throttled
        } else {
            RateLimitDecision::Allowed
        }
    }
}
