use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use panel_db::db::PanelDatabase;
use panel_db::settings::{self, ClientSettings, DeviceSettingsUpdate};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::auth::{self, Authenticator};
use crate::config::AppConfig;
use crate::error::PanelError;
use crate::library::MediaLibrary;
use crate::media::FrameSize;
use crate::panel::PanelStore;
use crate::sync::heartbeat::{self, Heartbeat, HeartbeatTracker};
use crate::sync::locator;
use crate::sync::pusher::SyncPusher;
use crate::sync::queue::{SyncJob, SyncQueue};

/// Everything request handlers share. Built once in `main` and handed out as
/// `State<Arc<AppState>>`.
pub struct AppState {
    pub panels: PanelStore,
    pub heartbeat: HeartbeatTracker,
    pub db: PanelDatabase,
    pub pusher: Arc<SyncPusher>,
    pub sync: SyncQueue,
    pub library: MediaLibrary,
    pub auth: Box<dyn Authenticator>,
    // read-modify-write of the settings record
    settings_lock: Mutex<()>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        db: PanelDatabase,
        cancel: CancellationToken,
    ) -> anyhow::Result<Arc<Self>> {
        let pusher = Arc::new(SyncPusher::new(config.push_timeout, config.device_port)?);
        let sync = SyncQueue::start(pusher.clone(), config.sync_workers, cancel);
        Ok(Arc::new(Self {
            panels: PanelStore::new(FrameSize::PANEL),
            heartbeat: HeartbeatTracker::new(),
            db,
            pusher,
            sync,
            library: MediaLibrary::new(&config.media_dir),
            auth: auth::from_token(config.api_token.as_deref()),
            settings_lock: Mutex::new(()),
        }))
    }

    pub async fn device_address(&self) -> Option<String> {
        locator::locate(&self.heartbeat, &self.db).await
    }

    pub async fn load_settings(&self) -> anyhow::Result<ClientSettings> {
        let conn = self.db.connect()?;
        settings::load(&conn).await
    }

    async fn save_settings(&self, record: &ClientSettings) -> Result<(), PanelError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| PanelError::PersistenceFailure(format!("{:#}", e)))?;
        settings::save(record, &conn)
            .await
            .map_err(|e| PanelError::PersistenceFailure(format!("{:#}", e)))
    }

    /// Validates and stores `update`, then queues delivery of the new device
    /// settings. Returns the stored record and whether the push was queued.
    pub async fn update_settings(
        &self,
        update: &DeviceSettingsUpdate,
    ) -> anyhow::Result<(ClientSettings, bool)> {
        let record = {
            let _guard = self.settings_lock.lock().await;
            let mut record = self.load_settings().await?;
            record.device = update
                .apply_to(&record.device)
                .map_err(PanelError::InvalidRequest)?;
            self.save_settings(&record).await?;
            record
        };
        log::info!("settings updated: {:?}", record.device);

        let queued = self.sync.submit(SyncJob::Settings {
            address: self.device_address().await,
            settings: record.device.clone(),
        });
        Ok((record, queued))
    }

    /// Holds a telemetry report and persists the device facts it carries. A
    /// failed write is logged and does not fail the report.
    pub async fn record_telemetry(
        &self,
        snapshot: Map<String, Value>,
        source: Option<IpAddr>,
    ) -> Heartbeat {
        let heartbeat = self.heartbeat.report(snapshot, source).await;

        let _guard = self.settings_lock.lock().await;
        let persisted = async {
            let mut record = self.load_settings().await?;
            heartbeat::merge_last_known(&mut record.last_known, &heartbeat);
            self.save_settings(&record).await?;
            anyhow::Ok(())
        };
        if let Err(e) = persisted.await {
            log::warn!("telemetry: persisting last known device facts failed: {:#}", e);
        }
        heartbeat
    }

    /// A config poll from `source`. Persists the address only when it changed.
    pub async fn record_poll(&self, source: IpAddr) {
        self.heartbeat.report_via_poll(source).await;

        let _guard = self.settings_lock.lock().await;
        let persisted = async {
            let mut record = self.load_settings().await?;
            let address = source.to_string();
            if record.last_known.last_ip == address {
                return anyhow::Ok(());
            }
            log::info!(
                "device address changed: {:?} -> {}",
                record.last_known.last_ip,
                address
            );
            record.last_known.last_ip = address;
            record.last_known.last_seen = Utc::now().timestamp_millis() as f64 / 1000.0;
            self.save_settings(&record).await?;
            anyhow::Ok(())
        };
        if let Err(e) = persisted.await {
            log::warn!("config poll: persisting device address failed: {:#}", e);
        }
    }
}
