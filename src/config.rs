use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_DB_URL: &str = "matrix.db";
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_DEVICE_PORT: u16 = 8000;
const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SYNC_WORKERS: usize = 2;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: String,
    pub db_url: String,
    pub media_dir: PathBuf,
    /// Port of the device API when the resolved address carries none.
    pub device_port: u16,
    pub push_timeout: Duration,
    pub sync_workers: usize,
    /// Operator endpoints require this bearer token when set.
    pub api_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            db_url: DEFAULT_DB_URL.to_string(),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            device_port: DEFAULT_DEVICE_PORT,
            push_timeout: Duration::from_secs(DEFAULT_PUSH_TIMEOUT_SECS),
            sync_workers: DEFAULT_SYNC_WORKERS,
            api_token: None,
        }
    }
}

fn parsed<T: std::str::FromStr>(name: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring invalid {}={:?}", name, raw);
            default
        }),
        None => default,
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // pushes must give up within single-digit seconds
        let timeout_secs = parsed(
            "MATRIX_PUSH_TIMEOUT_SECS",
            non_empty("MATRIX_PUSH_TIMEOUT_SECS"),
            DEFAULT_PUSH_TIMEOUT_SECS,
        )
        .clamp(1, 9);

        Self {
            listen: non_empty("MATRIX_LISTEN").unwrap_or(defaults.listen),
            db_url: non_empty("MATRIX_DB_URL").unwrap_or(defaults.db_url),
            media_dir: non_empty("MATRIX_MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_dir),
            device_port: parsed(
                "MATRIX_DEVICE_PORT",
                non_empty("MATRIX_DEVICE_PORT"),
                defaults.device_port,
            ),
            push_timeout: Duration::from_secs(timeout_secs),
            sync_workers: parsed(
                "MATRIX_SYNC_WORKERS",
                non_empty("MATRIX_SYNC_WORKERS"),
                defaults.sync_workers,
            )
            .max(1),
            api_token: non_empty("MATRIX_API_TOKEN"),
        }
    }
}

pub fn config() -> &'static AppConfig {
    static CONFIG: LazyLock<AppConfig> = LazyLock::new(AppConfig::from_env);
    &CONFIG
}
