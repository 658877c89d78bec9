// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon serve` command implementation.
//!
//! Opens storage, builds the dispatch stack from config, and runs the HTTP
//! gateway until SIGTERM/SIGINT. Pending retries are cancelled and drained
//! before exit.

use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_config::model::{BeaconConfig, CounterBackend};
use beacon_core::{BeaconError, CounterStore, PluginAdapter, PolicyStore, StorageAdapter};
use beacon_dispatch::{
    ComplianceValidator, DeliveryTracker, DispatchService, DispatchSettings, MemoryCounterStore,
    RateLimiter, RetryPolicies, RetryScheduler,
};
use beacon_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig, WebhookConfig};
use beacon_prometheus::PrometheusAdapter;
use beacon_storage::SqliteStorage;
use beacon_twilio::TwilioProvider;
use secrecy::SecretString;
use tracing::{debug, info, warn};

use crate::shutdown;

/// Open storage and load the compliance validator from it.
pub async fn open_compliance(
    config: &BeaconConfig,
) -> Result<(Arc<SqliteStorage>, Arc<ComplianceValidator>), BeaconError> {
    let storage = Arc::new(SqliteStorage::open(config.storage.clone()).await?);
    let policies = storage.load_policies().await?;
    info!(policies = policies.len(), "compliance policies loaded");
    let validator = ComplianceValidator::from_config(&config.compliance, policies);
    Ok((storage, Arc::new(validator)))
}

/// Runs the `beacon serve` command.
pub async fn run_serve(config: BeaconConfig) -> Result<(), BeaconError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting beacon serve");

    let (storage, validator) = open_compliance(&config).await?;

    let counters: Arc<dyn CounterStore> = match config.rate_limit.backend {
        CounterBackend::Memory => Arc::new(MemoryCounterStore::new()),
        CounterBackend::Sqlite => Arc::new(storage.counter_store()?),
    };
    let limiter = RateLimiter::from_config(counters, &config.rate_limit);

    let from_number = config.twilio.from_number.clone().ok_or_else(|| {
        BeaconError::Config("twilio.from_number is required to send messages".into())
    })?;
    let provider = Arc::new(TwilioProvider::new(&config.twilio)?);

    let prometheus = if config.prometheus.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => Some(Arc::new(adapter)),
            Err(e) => {
                warn!(error = %e, "prometheus initialization failed, continuing without metrics");
                None
            }
        }
    } else {
        debug!("prometheus metrics disabled by configuration");
        None
    };

    let settings = DispatchSettings {
        from_number,
        status_callback_url: config.service.status_callback_url(),
        provider_timeout: Duration::from_secs(config.twilio.timeout_secs),
    };
    if settings.status_callback_url.is_none() {
        warn!("service.public_base_url not set, delivery status callbacks disabled");
    }

    let mut components: Vec<Arc<dyn PluginAdapter>> = Vec::new();
    components.push(storage.clone());
    components.push(provider.clone());
    if let Some(adapter) = &prometheus {
        components.push(adapter.clone());
    }

    let service = Arc::new(DispatchService::new(
        limiter,
        validator,
        provider,
        storage.clone(),
        settings,
    ));
    let tracker = DeliveryTracker::new(storage.clone());

    let cancel = shutdown::install_signal_handler();
    let scheduler = RetryScheduler::new(
        service.clone(),
        RetryPolicies::from_config(&config.retry),
        cancel.clone(),
    );

    if config.gateway.enabled {
        if config.gateway.bearer_token.is_none() {
            warn!("gateway.bearer_token not set, the /v1 API will reject every request");
        }
        let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
            prometheus.map(|adapter| {
                Arc::new(move || adapter.render()) as Arc<dyn Fn() -> String + Send + Sync>
            });
        let state = GatewayState {
            service,
            scheduler: scheduler.clone(),
            tracker,
            store: storage.clone(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            webhook: WebhookConfig {
                auth_token: config.twilio.auth_token.clone().map(SecretString::from),
                callback_url: config.service.status_callback_url(),
                verify_signatures: config.gateway.verify_signatures,
            },
            health: HealthState {
                start_time: Instant::now(),
                prometheus_render,
                components,
            },
        };
        let server = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        beacon_gateway::start_server(&server, state, cancel.clone()).await?;
    } else {
        info!("gateway disabled, waiting for shutdown signal");
        cancel.cancelled().await;
    }

    info!(in_flight = scheduler.in_flight(), "draining retry scheduler");
    scheduler.shutdown().await;
    storage.close().await?;
    info!("beacon stopped");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("beacon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
