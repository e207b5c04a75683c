//! UseCase: 受信イベントのレート制限
//!
//! 接続ごとの `RateLimitWindow` を保持し、受信イベント 1 件ごとに判定します。
//! ウィンドウは最初のイベントで作られ、切断時に破棄されます。

use std::{collections::HashMap, sync::Arc};

use huddle_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, RateLimitDecision, RateLimitPolicy, RateLimitWindow, Timestamp};

pub struct RateLimiter {
    policy: RateLimitPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<ConnectionId, RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// イベントを 1 件数えて判定する
    pub async fn check(&self, connection_id: &ConnectionId) -> RateLimitDecision {
        let now = Timestamp::new(self.clock.now_millis());
        let mut windows = self.windows.lock().await;
        match windows.get_mut(connection_id) {
            Some(window) => window.hit(now, &self.policy),
            None => {
                windows.insert(*connection_id, RateLimitWindow::start(now));
                RateLimitDecision::Allowed
            }
        }
    }

    /// 接続のウィンドウを破棄する
    pub async fn remove(&self, connection_id: &ConnectionId) -> bool {
        self.windows.lock().await.remove(connection_id).is_some()
    }

    pub async fn count_windows(&self) -> usize {
        self.windows.lock().await.len()
    }
}
