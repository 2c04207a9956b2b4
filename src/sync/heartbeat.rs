use std::net::IpAddr;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use panel_db::settings::LastKnown;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

/// Latest telemetry held for the device.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    pub snapshot: Map<String, Value>,
    pub received_at: Instant,
    pub received_wall: DateTime<Utc>,
}

impl Heartbeat {
    /// The device address carried by the snapshot, if any.
    pub fn address(&self) -> Option<&str> {
        self.snapshot
            .get("ip")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

#[derive(Default)]
pub struct HeartbeatTracker {
    inner: RwLock<Option<Heartbeat>>,
}

fn stamp(snapshot: &mut Map<String, Value>, source: Option<IpAddr>, wall: DateTime<Utc>) {
    if let Some(source) = source {
        snapshot.insert("source_addr".to_string(), Value::String(source.to_string()));
        let has_ip = snapshot
            .get("ip")
            .and_then(Value::as_str)
            .is_some_and(|ip| !ip.trim().is_empty());
        if !has_ip {
            snapshot.insert("ip".to_string(), Value::String(source.to_string()));
        }
    }
    snapshot.insert("received_at".to_string(), Value::String(wall.to_rfc3339()));
}

impl HeartbeatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held snapshot wholesale with `snapshot`, enriched with the
    /// observed source address and the receive time.
    pub async fn report(&self, snapshot: Map<String, Value>, source: Option<IpAddr>) -> Heartbeat {
        self.report_at(snapshot, source, Instant::now(), Utc::now())
            .await
    }

    pub async fn report_at(
        &self,
        mut snapshot: Map<String, Value>,
        source: Option<IpAddr>,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> Heartbeat {
        stamp(&mut snapshot, source, wall);
        let heartbeat = Heartbeat {
            snapshot,
            received_at: now,
            received_wall: wall,
        };
        *self.inner.write().await = Some(heartbeat.clone());
        heartbeat
    }

    /// A config poll from `source`: refreshes only the address and receive time.
    pub async fn report_via_poll(&self, source: IpAddr) {
        self.report_via_poll_at(source, Instant::now(), Utc::now())
            .await
    }

    pub async fn report_via_poll_at(&self, source: IpAddr, now: Instant, wall: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        let heartbeat = inner.get_or_insert_with(|| Heartbeat {
            snapshot: Map::new(),
            received_at: now,
            received_wall: wall,
        });
        heartbeat
            .snapshot
            .insert("ip".to_string(), Value::String(source.to_string()));
        stamp(&mut heartbeat.snapshot, Some(source), wall);
        heartbeat.received_at = now;
        heartbeat.received_wall = wall;
    }

    pub async fn current(&self) -> Option<Heartbeat> {
        self.inner.read().await.clone()
    }

    pub async fn address(&self) -> Option<String> {
        self.inner
            .read()
            .await
            .as_ref()
            .and_then(|hb| hb.address().map(str::to_string))
    }

    /// Time since the last report or poll; `None` before the first one.
    pub async fn age(&self) -> Option<Duration> {
        self.age_at(Instant::now()).await
    }

    pub async fn age_at(&self, now: Instant) -> Option<Duration> {
        self.inner
            .read()
            .await
            .as_ref()
            .map(|hb| now.saturating_duration_since(hb.received_at))
    }
}

/// Copies the facts the device reports about itself into the persisted record.
pub fn merge_last_known(last: &mut LastKnown, heartbeat: &Heartbeat) {
    let text = |key: &str| {
        heartbeat
            .snapshot
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    if let Some(ip) = heartbeat.address() {
        last.last_ip = ip.to_string();
    }
    if let Some(ssid) = text("ssid") {
        last.last_ssid = ssid;
    }
    if let Some(network_type) = text("network_type") {
        last.last_network_type = network_type;
    }
    if let Some(rate) = heartbeat.snapshot.get("refresh_rate").and_then(Value::as_f64) {
        last.last_refresh_rate = rate;
    }
    last.last_seen = heartbeat.received_wall.timestamp_millis() as f64 / 1000.0;
}
