//! UseCase: 接続ごとのハートビートタスク
//!
//! ## 設計ノート
//!
//! 接続 1 つにつきタスクは 1 つだけ起動します。タスクの停止用 `oneshot::Sender` を
//! `HeartbeatTasks` に登録し、そこから取り除いた者だけが停止を指示できるため、
//! 停止は接続ごとにちょうど 1 回になります。
//!
//! 実行中の再検証が切断と競合した場合でも、再検証は Repository に存在しない接続へ
//! 状態を戻しません（`RevalidateSessionUseCase` を参照）。

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, oneshot},
    time::{Instant, MissedTickBehavior},
};

use crate::domain::ConnectionId;

use super::revalidate_session::{HeartbeatOutcome, RevalidateSessionUseCase};

/// 起動中のハートビートタスクの停止ハンドル
#[derive(Debug, Default)]
pub struct HeartbeatTasks {
    stops: Mutex<HashMap<ConnectionId, oneshot::Sender<()>>>,
}

impl HeartbeatTasks {
    async fn register(&self, connection_id: ConnectionId, stop: oneshot::Sender<()>) -> bool {
        let mut stops = self.stops.lock().await;
        if stops.contains_key(&connection_id) {
            return false;
        }
        stops.insert(connection_id, stop);
        true
    }

    /// タスクを停止する（起動していなければ `false`）
    pub async fn cancel(&self, connection_id: &ConnectionId) -> bool {
        let stop = self.stops.lock().await.remove(connection_id);
        match stop {
            Some(stop) => {
                // タスクがすでに終了していれば受信側は破棄されている
                let _ = stop.send(());
                tracing::debug!(%connection_id, "Heartbeat cancelled");
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self, connection_id: &ConnectionId) -> bool {
        self.stops.lock().await.contains_key(connection_id)
    }

    pub async fn count(&self) -> usize {
        self.stops.lock().await.len()
    }
}

/// ハートビート間隔の下限（0 では `tokio::time::interval` が使えない）
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// ハートビートタスクを起動する
pub struct HeartbeatSupervisor {
    revalidate: Arc<RevalidateSessionUseCase>,
    tasks: Arc<HeartbeatTasks>,
    interval: Duration,
}

impl HeartbeatSupervisor {
    pub fn new(
        revalidate: Arc<RevalidateSessionUseCase>,
        tasks: Arc<HeartbeatTasks>,
        interval: Duration,
    ) -> Self {
        if interval < MIN_HEARTBEAT_INTERVAL {
            tracing::warn!(
                requested_millis = interval.as_millis() as u64,
                "Heartbeat interval too short, using {}s",
                MIN_HEARTBEAT_INTERVAL.as_secs()
            );
        }
        Self {
            revalidate,
            tasks,
            interval: interval.max(MIN_HEARTBEAT_INTERVAL),
        }
    }

    /// 接続のハートビートを開始する（すでに起動していれば `false`）
    pub async fn start(&self, connection_id: ConnectionId) -> bool {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        if !self.tasks.register(connection_id, stop_tx).await {
            tracing::warn!(%connection_id, "Heartbeat already running");
            return false;
        }

        let revalidate = self.revalidate.clone();
        let tasks = self.tasks.clone();
        let interval = self.interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        match revalidate.execute(&connection_id).await {
                            HeartbeatOutcome::Healthy { revoked } => {
                                if !revoked.is_empty() {
                                    tracing::info!(%connection_id, ?revoked, "Heartbeat revoked rooms");
                                }
                            }
                            HeartbeatOutcome::Closed(_) => break,
                            HeartbeatOutcome::Gone => {
                                tasks.cancel(&connection_id).await;
                                break;
                            }
                        }
                    }
                }
            }
            tracing::debug!(%connection_id, "Heartbeat task finished");
        });

        tracing::debug!(%connection_id, interval_secs = interval.as_secs(), "Heartbeat started");
        true
    }
}
