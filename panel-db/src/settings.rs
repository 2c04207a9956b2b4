use serde::{Deserialize, Serialize};
use turso::Connection;

const MODULE_NAME: &str = "client_settings";
const RECORD_KEY: &str = "default";

/// Settings delivered to the display device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Panel brightness in percent.
    pub brightness: u8,
    /// Clockwise rotation of both panels in degrees.
    pub rotation: u16,
    /// How often the device pulls frames and config.
    pub poll_interval_secs: u32,
    pub telemetry_interval_secs: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            brightness: 80,
            rotation: 0,
            poll_interval_secs: 1,
            telemetry_interval_secs: 30,
        }
    }
}

impl DeviceSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.brightness > 100 {
            return Err(format!("brightness must be 0-100, got {}", self.brightness));
        }
        if !matches!(self.rotation, 0 | 90 | 180 | 270) {
            return Err(format!("rotation must be 0, 90, 180 or 270, got {}", self.rotation));
        }
        if self.poll_interval_secs == 0 {
            return Err("poll_interval_secs must be at least 1".to_string());
        }
        if self.telemetry_interval_secs == 0 {
            return Err("telemetry_interval_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Last facts the device reported about itself. `last_ip` is the fallback address
/// used to reach the device when no live telemetry is held.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LastKnown {
    pub last_ip: String,
    pub last_ssid: String,
    pub last_network_type: String,
    pub last_refresh_rate: f64,
    /// Unix seconds.
    pub last_seen: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub device: DeviceSettings,
    pub last_known: LastKnown,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceSettingsUpdate {
    pub brightness: Option<u8>,
    pub rotation: Option<u16>,
    pub poll_interval_secs: Option<u32>,
    pub telemetry_interval_secs: Option<u32>,
}

impl DeviceSettingsUpdate {
    /// Returns `current` with every present field replaced, or the first validation error.
    pub fn apply_to(&self, current: &DeviceSettings) -> Result<DeviceSettings, String> {
        let mut next = current.clone();
        if let Some(brightness) = self.brightness {
            next.brightness = brightness;
        }
        if let Some(rotation) = self.rotation {
            next.rotation = rotation;
        }
        if let Some(poll) = self.poll_interval_secs {
            next.poll_interval_secs = poll;
        }
        if let Some(telemetry) = self.telemetry_interval_secs {
            next.telemetry_interval_secs = telemetry;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Loads the settings record, falling back to defaults when none was saved yet.
pub async fn load(conn: &Connection) -> anyhow::Result<ClientSettings> {
    let kv = crate::kv::by_module_and_key(MODULE_NAME, RECORD_KEY, conn).await?;
    match kv.and_then(|kv| kv.value) {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(ClientSettings::default()),
    }
}

pub async fn save(settings: &ClientSettings, conn: &Connection) -> anyhow::Result<()> {
    let value = serde_json::to_string(settings)?;
    crate::kv::put(MODULE_NAME, RECORD_KEY, &value, conn).await?;
    Ok(())
}
