//! Warden Daemon - community moderation and support tickets
//!
//! Wires the services together and serves the connector-facing HTTP API.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wardend::automod::Automod;
use wardend::commands::CommandDispatcher;
use wardend::events::EventRouter;
use wardend::gateway::{ChatGateway, HttpGateway};
use wardend::moderation::{ModerationService, RestrictionScheduler};
use wardend::server::{self, AppState};
use wardend::tickets::TicketRegistry;
use warden_common::{ContentPolicyFilter, InfractionLedger, UserId, WardenConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Warden Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = WardenConfig::load()?;
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let gateway: Arc<dyn ChatGateway> = Arc::new(HttpGateway::new(&config.connector_url));

    // The connector may still be coming up; run degraded until the first
    // restart rather than crash-looping against it.
    let identity = match gateway.identity().await {
        Ok(id) => id,
        Err(e) => {
            warn!("connector not reachable yet, automated infractions will carry id 0: {e:#}");
            UserId(0)
        }
    };

    let filter = ContentPolicyFilter::new(
        &config.prohibited_terms,
        config.spam_window_secs,
        config.spam_repeat_limit,
        config.spam_cache_capacity,
    );
    let ledger = Arc::new(InfractionLedger::new(config.infraction_store_path()));
    let scheduler = Arc::new(RestrictionScheduler::new(
        Arc::clone(&gateway),
        &config.mute_role,
    ));
    let automod = Arc::new(Automod::new(
        Arc::clone(&gateway),
        filter,
        Arc::clone(&ledger),
        Arc::clone(&scheduler),
        identity,
        config.warn_limit,
        config.escalation_mute_minutes,
    ));
    let moderation = Arc::new(ModerationService::new(
        Arc::clone(&gateway),
        Arc::clone(&ledger),
        Arc::clone(&scheduler),
        &config.support_role,
        config.warn_limit,
        config.escalation_mute_minutes,
    ));
    let tickets = Arc::new(TicketRegistry::new(
        Arc::clone(&gateway),
        config.ticket_counter_path(),
        &config.support_role,
        &config.ticket_category,
        &config.archive_channel,
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&gateway),
        moderation,
        Arc::clone(&tickets),
    ));
    let router = EventRouter::new(
        gateway,
        automod,
        tickets,
        dispatcher,
        &config.welcome_channel,
    );

    info!("Warden Daemon ready");
    server::run(AppState::new(router), &config.listen_addr).await
}
