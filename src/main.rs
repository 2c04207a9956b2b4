use tokio_util::sync::CancellationToken;

mod api;
mod auth;
mod config;
mod error;
mod handler;
mod library;
mod media;
mod panel;
mod state;
mod sync;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("ffmpeg_frames", log::LevelFilter::Info)
        .init();
}

#[tokio::main]
async fn main() -> ! {
    init_logging();
    ffmpeg_frames::init().unwrap_or_else(|e| {
        log::error!("Error initializing ffmpeg: {:#}", e);
        std::process::exit(1);
    });
    let config = config::config();
    let db = panel_db::db::PanelDatabase::open(&config.db_url)
        .await
        .unwrap_or_else(|e| {
            log::error!("Error opening database {}: {:#}", config.db_url, e);
            std::process::exit(1);
        });

    let cancel = CancellationToken::new();

    let state = state::AppState::new(config, db, cancel.clone()).unwrap_or_else(|e| {
        log::error!("Error building server state: {:#}", e);
        std::process::exit(1);
    });

    let cancel_clone = cancel.clone();
    api::start_api_server(state, config.listen.clone(), cancel_clone);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            },
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
            },
        }
    }

    std::process::exit(0);
}
