use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use panel_db::settings::DeviceSettings;
use reqwest::{RequestBuilder, Url, multipart};
use serde::Serialize;

use crate::error::PanelError;

/// What happened to one push attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PushOutcome {
    Delivered,
    /// No address is known for the device, nothing was sent.
    Skipped { reason: String },
    Failed { error: String },
}

impl PushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PushOutcome::Delivered)
    }
}

/// A file part of a content push.
#[derive(Debug, Clone)]
pub struct ContentFile {
    pub field: &'static str,
    pub filename: String,
    pub bytes: Bytes,
}

impl ContentFile {
    pub fn new(field: &'static str, filename: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            field,
            filename: filename.into(),
            bytes,
        }
    }
}

/// Single-attempt HTTP delivery to the device API.
pub struct SyncPusher {
    client: reqwest::Client,
    device_port: u16,
}

/// `address` with `default_port` appended when it carries none.
fn authority(address: &str, default_port: u16) -> String {
    if address.parse::<SocketAddr>().is_ok() {
        return address.to_string();
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, default_port),
        Ok(ip) => format!("{}:{}", ip, default_port),
        Err(_) if address.contains(':') => address.to_string(),
        Err(_) => format!("{}:{}", address, default_port),
    }
}

impl SyncPusher {
    pub fn new(timeout: Duration, device_port: u16) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            device_port,
        })
    }

    fn url(&self, address: &str, segments: &[&str]) -> Result<Url, String> {
        let base = format!("http://{}/", authority(address, self.device_port));
        let mut url = Url::parse(&base).map_err(|e| format!("bad device address {:?}: {}", address, e))?;
        url.path_segments_mut()
            .map_err(|_| format!("bad device address {:?}", address))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn target(&self, action: &str, address: Option<&str>, segments: &[&str]) -> Result<Url, PushOutcome> {
        let Some(address) = address else {
            log::warn!("push {}: device address unknown, skipped", action);
            return Err(PushOutcome::Skipped {
                reason: "device address unknown".to_string(),
            });
        };
        self.url(address, segments).map_err(|error| {
            log::warn!("push {}: {}", action, error);
            PushOutcome::Failed { error }
        })
    }

    async fn deliver(&self, action: &str, request: RequestBuilder) -> PushOutcome {
        let result = match request.send().await {
            Ok(response) => response.error_for_status().map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                log::info!("push {}: delivered", action);
                PushOutcome::Delivered
            }
            Err(e) => {
                log::warn!("push {}: failed: {}", action, e);
                PushOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Sends the undecoded media of a draw/upload so the device can play it locally.
    pub async fn push_content(
        &self,
        address: Option<&str>,
        mode: &str,
        files: Vec<ContentFile>,
    ) -> PushOutcome {
        let url = match self.target("content", address, &["api", "content"]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        let mut form = multipart::Form::new().text("mode", mode.to_string());
        for file in files {
            let part = multipart::Part::bytes(file.bytes.to_vec()).file_name(file.filename);
            form = form.part(file.field, part);
        }
        self.deliver("content", self.client.post(url).multipart(form))
            .await
    }

    pub async fn push_settings(&self, address: Option<&str>, settings: &DeviceSettings) -> PushOutcome {
        let url = match self.target("settings", address, &["api", "settings"]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        self.deliver("settings", self.client.post(url).json(settings))
            .await
    }

    pub async fn upload_file(&self, address: Option<&str>, name: &str, bytes: Bytes) -> PushOutcome {
        let url = match self.target("file upload", address, &["api", "files"]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        let part = multipart::Part::bytes(bytes.to_vec()).file_name(name.to_string());
        let form = multipart::Form::new().part("file", part);
        self.deliver("file upload", self.client.post(url).multipart(form))
            .await
    }

    pub async fn delete_file(&self, address: Option<&str>, name: &str) -> PushOutcome {
        let url = match self.target("file delete", address, &["api", "files", name]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        self.deliver("file delete", self.client.delete(url)).await
    }

    pub async fn play_file(&self, address: Option<&str>, name: &str) -> PushOutcome {
        let url = match self.target("play", address, &["api", "files", name, "play"]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        self.deliver("play", self.client.post(url)).await
    }

    pub async fn stop(&self, address: Option<&str>) -> PushOutcome {
        let url = match self.target("stop", address, &["api", "stop"]) {
            Ok(url) => url,
            Err(outcome) => return outcome,
        };
        self.deliver("stop", self.client.post(url)).await
    }

    /// Names of the files stored on the device. Unlike pushes this is a read the
    /// caller asked for, so an unreachable device is an error.
    pub async fn list_files(&self, address: Option<&str>) -> Result<Vec<String>, PanelError> {
        let address =
            address.ok_or_else(|| PanelError::DeviceUnreachable("device address unknown".to_string()))?;
        let url = self
            .url(address, &["api", "files"])
            .map_err(PanelError::DeviceUnreachable)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PanelError::DeviceUnreachable(e.to_string()))?;
        response
            .json::<Vec<String>>()
            .await
            .map_err(|e| PanelError::DeviceUnreachable(format!("bad file list: {}", e)))
    }
}

#[cfg(test)]
#[path = "pusher_test.rs"]
mod pusher_test;
