//! Home Assistant Rust Server - auto_group runner
//!
//! Loads `configuration.yaml` and the entity registry from a config
//! directory, registers the group services, runs auto_group setup once and
//! prints the resulting groups as JSON lines.

use anyhow::{Context as _, Result};
use clap::Parser;
use ha_components::auto_group::{self, AutoGroupConfig};
use ha_components::group::{DOMAIN as GROUP_DOMAIN, SERVICE_SET};
use ha_components::{register_group_services, GroupStore};
use ha_registries::{EntityRegistry, Storage};
use ha_service_registry::ServiceRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "auto-group")]
#[command(about = "Build Home Assistant groups from include filters")]
struct Cli {
    /// Home Assistant config directory
    #[arg(short, long, env = "HASS_CONFIG", default_value = ".")]
    config: PathBuf,

    /// Configuration file, relative to the config directory
    #[arg(long, default_value = "configuration.yaml")]
    config_file: PathBuf,
}

/// The pieces of a Home Assistant instance auto_group needs
pub struct HomeAssistant {
    /// Entity registry loaded from `.storage`
    pub entities: EntityRegistry,
    /// Service registry for service calls
    pub services: Arc<ServiceRegistry>,
    /// Runtime groups
    pub groups: Arc<GroupStore>,
}

impl HomeAssistant {
    pub fn new(config_dir: &std::path::Path) -> Self {
        let storage = Arc::new(Storage::new(config_dir));
        let services = Arc::new(ServiceRegistry::new());
        let groups = Arc::new(GroupStore::new());
        register_group_services(&services, groups.clone());

        Self {
            entities: EntityRegistry::new(storage),
            services,
            groups,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Starting auto_group with config dir {:?}", cli.config);

    let raw = ha_config::load_yaml(&cli.config, &cli.config_file)
        .with_context(|| format!("loading {}", cli.config_file.display()))?;
    let config = AutoGroupConfig::from_config(&raw).context("invalid auto_group configuration")?;

    let hass = HomeAssistant::new(&cli.config);
    anyhow::ensure!(
        hass.services.has_service(GROUP_DOMAIN, SERVICE_SET),
        "{}.{} service is not registered",
        GROUP_DOMAIN,
        SERVICE_SET
    );
    info!("Registered {} services", hass.services.service_count());
    hass.entities
        .load()
        .await
        .context("loading entity registry")?;
    info!("Entity registry has {} entities", hass.entities.len());

    let report = auto_group::async_setup(&config, &hass.entities, hass.services.as_ref())
        .await
        .context("auto_group setup failed")?;

    for group in hass.groups.all() {
        println!("{}", serde_json::to_string(&group)?);
    }

    info!(
        "auto_group set up {} groups with {} warnings",
        report.groups.len(),
        report.warnings.len()
    );
    Ok(())
}
