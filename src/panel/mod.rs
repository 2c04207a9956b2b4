//! The two panel slots and what each one shows right now.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use image::RgbImage;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::PanelError;
use crate::media::{Content, FrameSize};

pub mod clock;

/// A panel counts as connected while it was read within this window.
pub const CONNECTED_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PanelId {
    A,
    B,
}

impl PanelId {
    pub const ALL: [PanelId; 2] = [PanelId::A, PanelId::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            PanelId::A => "A",
            PanelId::B => "B",
        }
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PanelId {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(PanelId::A),
            "b" | "B" => Ok(PanelId::B),
            _ => Err(PanelError::invalid(format!(
                "invalid panel identifier {:?}, use \"a\" or \"b\"",
                s
            ))),
        }
    }
}

/// One panel or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelTarget {
    One(PanelId),
    Both,
}

impl PanelTarget {
    pub fn panels(&self) -> Vec<PanelId> {
        match self {
            PanelTarget::One(id) => vec![*id],
            PanelTarget::Both => PanelId::ALL.to_vec(),
        }
    }
}

impl FromStr for PanelTarget {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "both" | "all" => Ok(PanelTarget::Both),
            other => other.parse().map(PanelTarget::One),
        }
    }
}

struct PanelSlot {
    content: Content,
    last_read: Option<Instant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelStatus {
    pub id: PanelId,
    pub connected: bool,
    pub content: &'static str,
    pub frames: usize,
    pub last_read_secs: Option<f64>,
}

/// Owns the content of both panels. Each slot has its own lock, so writes to one
/// panel are serialized while the other stays readable.
pub struct PanelStore {
    size: FrameSize,
    a: Mutex<PanelSlot>,
    b: Mutex<PanelSlot>,
}

impl PanelStore {
    pub fn new(size: FrameSize) -> Self {
        let slot = || {
            Mutex::new(PanelSlot {
                content: Content::blank(size),
                last_read: None,
            })
        };
        Self {
            size,
            a: slot(),
            b: slot(),
        }
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    fn slot(&self, id: PanelId) -> &Mutex<PanelSlot> {
        match id {
            PanelId::A => &self.a,
            PanelId::B => &self.b,
        }
    }

    pub async fn put(&self, id: PanelId, content: Content) {
        self.put_at(id, content, Instant::now()).await
    }

    /// Replaces the panel's content. Animations restart their loop at `now`.
    pub async fn put_at(&self, id: PanelId, mut content: Content, now: Instant) {
        content.restart(now);
        log::info!(
            "panel {}: showing {} content ({} frames)",
            id,
            content.kind(),
            content.frame_count()
        );
        self.slot(id).lock().await.content = content;
    }

    pub async fn put_pair(&self, a: Content, b: Content) {
        self.put_pair_at(a, b, Instant::now()).await
    }

    /// Replaces both panels under both locks with one shared start instant.
    pub async fn put_pair_at(&self, mut a: Content, mut b: Content, now: Instant) {
        a.restart(now);
        b.restart(now);
        log::info!(
            "panels A+B: showing {} / {} content ({} / {} frames)",
            a.kind(),
            b.kind(),
            a.frame_count(),
            b.frame_count()
        );
        // always A before B
        let mut slot_a = self.a.lock().await;
        let mut slot_b = self.b.lock().await;
        slot_a.content = a;
        slot_b.content = b;
    }

    pub async fn read(&self, id: PanelId) -> RgbImage {
        self.read_at(id, Instant::now()).await
    }

    /// The frame visible at `now`. Marks the panel as read.
    pub async fn read_at(&self, id: PanelId, now: Instant) -> RgbImage {
        let mut slot = self.slot(id).lock().await;
        slot.last_read = Some(now);
        clock::current_frame(&slot.content, now).clone()
    }

    pub async fn clear(&self, target: PanelTarget) {
        let now = Instant::now();
        match target {
            PanelTarget::One(id) => self.put_at(id, Content::blank(self.size), now).await,
            PanelTarget::Both => {
                self.put_pair_at(Content::blank(self.size), Content::blank(self.size), now)
                    .await
            }
        }
    }

    pub async fn content(&self, id: PanelId) -> Content {
        self.slot(id).lock().await.content.clone()
    }

    pub async fn connected(&self, id: PanelId) -> bool {
        self.connected_at(id, Instant::now()).await
    }

    pub async fn connected_at(&self, id: PanelId, now: Instant) -> bool {
        let slot = self.slot(id).lock().await;
        is_connected(slot.last_read, now)
    }

    pub async fn status_at(&self, id: PanelId, now: Instant) -> PanelStatus {
        let slot = self.slot(id).lock().await;
        PanelStatus {
            id,
            connected: is_connected(slot.last_read, now),
            content: slot.content.kind(),
            frames: slot.content.frame_count(),
            last_read_secs: slot
                .last_read
                .map(|t| now.saturating_duration_since(t).as_secs_f64()),
        }
    }
}

fn is_connected(last_read: Option<Instant>, now: Instant) -> bool {
    last_read.is_some_and(|t| now.saturating_duration_since(t) < CONNECTED_WINDOW)
}
