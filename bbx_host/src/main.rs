use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use bbx_host::{Session, SessionConfig};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "bbx_host=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn config_path() -> PathBuf {
    std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("session.json"))
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = config_path();
    let config = SessionConfig::from_path(&path)?;
    tracing::info!(?path, sample_rate = config.sample_rate, "loaded session configuration");

    let session = Session::new(&config)?;
    session.start()?;
    tracing::info!("composite device stream running");

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))?;
    while running.load(Ordering::SeqCst) {
        if let Err(err) = session.poll_overruns() {
            tracing::warn!(%err, "render callback reported an overrun");
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    tracing::info!("shutting down");
    session.stop()?;
    Ok(())
}
