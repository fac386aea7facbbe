use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use log::info;

use attendance_capture::{CaptureView, Config, SessionStatus};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("attendance-capture starting up...");

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(Config::default_path()));
    let config = Config::load(&config_path)?;
    info!(
        "recognition endpoint {}, camera {}, tick every {}s",
        config.endpoint, config.camera_index, config.tick_interval_secs
    );

    let mut view = CaptureView::mount(&config).await?;
    view.start_capture().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if view.status().await == SessionStatus::Stopped {
                    info!("{}", view.last_message().await);
                    break;
                }
            }
        }
    }

    view.teardown().await;
    Ok(())
}
