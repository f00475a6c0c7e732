mod app;
mod widgets;

use std::sync::Arc;

use eframe::{egui, NativeOptions};
use libby_core::config::ApiConfig;
use libby_core::{
    ApiClient, AppConfig, FileStore, InteractionTracker, LocalIdentity, PreferenceCache,
    RemoteSync, Session, SharedStore,
};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, LibbyApp};

fn main() -> eframe::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    let api = build_api(&config);
    info!(api = %api.base_url(), "using recommendation API");

    let store = load_store(&config);
    let sync = RemoteSync::new(api.clone(), runtime.handle().clone());
    let tracker = InteractionTracker::new(api.clone());
    let mut session = Session::new(
        Box::new(LocalIdentity::open(store.clone())),
        PreferenceCache::new(store),
        Some(sync),
    );
    if let Some(user) = session.restore() {
        info!(user = %user.id, "restored previous session");
    }

    let (update_tx, update_rx) = mpsc::unbounded_channel();

    eframe::run_native(
        "Libby Bot",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([960.0, 800.0])
                .with_min_inner_size([640.0, 500.0]),
            ..Default::default()
        },
        Box::new(move |cc| {
            let init = AppInit {
                runtime,
                api,
                tracker,
                session,
                config,
                ctx: cc.egui_ctx.clone(),
                update_tx,
                updates: update_rx,
            };
            Box::new(LibbyApp::new(init))
        }),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn build_api(config: &AppConfig) -> ApiClient {
    ApiClient::from_config(&config.api)
        .or_else(|err| {
            warn!(error = %err, url = %config.api.base_url, "unusable API config, using defaults");
            ApiClient::from_config(&ApiConfig::default())
        })
        .expect("failed to build HTTP client")
}

fn load_store(config: &AppConfig) -> SharedStore {
    // Linux: ~/.local/share/libby/store.json
    let dir = config.data_dir();
    FileStore::open_in_dir(dir).shared()
}
