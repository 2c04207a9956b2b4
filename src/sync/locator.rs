//! Where the device can be reached right now.
//!
//! Re-derived on every call from live telemetry first, then the persisted
//! last-known address. Nothing is cached, so an address change shows up on the
//! very next resolution.

use panel_db::db::PanelDatabase;

use super::heartbeat::HeartbeatTracker;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn resolve(telemetry: Option<&str>, stored: Option<&str>) -> Option<String> {
    non_empty(telemetry)
        .or_else(|| non_empty(stored))
        .map(str::to_string)
}

pub async fn locate(heartbeat: &HeartbeatTracker, db: &PanelDatabase) -> Option<String> {
    if let Some(address) = heartbeat.address().await {
        return resolve(Some(&address), None);
    }

    let stored = match stored_address(db).await {
        Ok(stored) => stored,
        Err(e) => {
            log::warn!("device locator: reading last known address failed: {:#}", e);
            None
        }
    };
    let address = resolve(None, stored.as_deref());
    if address.is_none() {
        log::debug!("device locator: no telemetry and no stored address");
    }
    address
}

async fn stored_address(db: &PanelDatabase) -> anyhow::Result<Option<String>> {
    let conn = db.connect()?;
    let settings = panel_db::settings::load(&conn).await?;
    Ok(Some(settings.last_known.last_ip))
}
