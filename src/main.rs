pub mod config;
pub mod controller;
pub mod mapping;
pub mod output;

use crate::controller::GilrsPoller;
use crate::mapping::{ActionDispatcher, Profile, ProfileEngineHandle};
use crate::output::TraceSink;
use color_eyre::eyre::{eyre, Result};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let base = config::base_dir();
    info!("Loading configuration from {:?}", base);
    let settings = config::load_settings(&base).await?;
    let descriptors = config::load_descriptors(&base, &settings).await?;
    let mut profiles = config::load_profiles(&base, &settings).await?;

    let profile_config = profiles
        .remove(&settings.profile)
        .ok_or_else(|| eyre!("No profile named {:?} found", settings.profile))?;
    let descriptor = descriptors
        .get(&profile_config.controller)
        .cloned()
        .ok_or_else(|| {
            eyre!(
                "Profile {:?} wants unknown controller {:?}",
                settings.profile,
                profile_config.controller
            )
        })?;

    let poller = GilrsPoller::new(&descriptor)
        .map_err(|e| eyre!("Failed to open controller backend: {}", e))?;
    let dispatcher = ActionDispatcher::new(Box::new(TraceSink::new()));
    let profile = Profile::bind(
        settings.profile.clone(),
        &profile_config,
        descriptor,
        Box::new(poller),
        dispatcher,
    )?;

    let mut handle = ProfileEngineHandle::new(settings.profile.clone());
    let mut events = handle.start(profile, settings.step_dt)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }

            event = events.recv() => match event {
                Some(event) => info!("{:?}: {:?}", event.state, event.response),
                None => {
                    info!("Engine loop ended");
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
