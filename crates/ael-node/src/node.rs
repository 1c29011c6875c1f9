//! The AEL node orchestrator.
//!
//! Wires the ledger store, settlement orchestrator, payment gate and channel
//! engine together, then runs the HTTP API and the settlement reconciler as
//! background tasks that stop on a shared shutdown signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ael_channel::{ChannelEngine, LedgerEngine, SettlementReconciler};
use ael_events::EventHub;
use ael_ledger::{LedgerStore, MemoryLedger, RocksLedger};
use ael_payment::{Facilitator, HttpFacilitator, PaymentGate, VerificationMode};
use ael_settlement::{EscrowClient, HttpEscrowClient, HttpResolver, IdentityResolver, Settler, StaticResolver};
use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{AelConfig, StorageBackend};
use crate::state::AppState;

/// Event queue depth per subscriber.
const EVENT_CAPACITY: usize = 256;

/// The AEL node, owning every long-lived component.
pub struct AelNode {
    /// Node configuration.
    config: AelConfig,
    /// Shared state handed to the HTTP handlers.
    state: Arc<AppState>,
    /// Channel events, for transports that want to subscribe.
    events: Arc<EventHub>,
    reconciler: Arc<SettlementReconciler>,
    shutdown_tx: watch::Sender<bool>,
    api_task: Option<JoinHandle<()>>,
    reconciler_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl AelNode {
    /// Build every component from config. Nothing is spawned yet.
    pub fn new(config: AelConfig) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn LedgerStore> = match config.storage.backend {
            StorageBackend::Memory => {
                tracing::info!("using in-memory ledger, balances are lost on restart");
                Arc::new(MemoryLedger::new())
            }
            StorageBackend::Rocksdb => {
                let path = config.storage.data_dir.join("ledger");
                Arc::new(RocksLedger::open(&path)?)
            }
        };

        let settlement_timeout = Duration::from_millis(config.settlement.timeout_ms);
        let escrow: Option<Arc<dyn EscrowClient>> = match &config.settlement.escrow_url {
            Some(url) => {
                tracing::info!(%url, "escrow configured");
                Some(Arc::new(HttpEscrowClient::new(url.clone(), settlement_timeout)?))
            }
            None => {
                tracing::info!("no escrow configured, channels will settle off-chain only");
                None
            }
        };

        let resolver: Arc<dyn IdentityResolver> = match &config.settlement.resolver_url {
            Some(url) => {
                if !config.settlement.addresses.is_empty() {
                    tracing::warn!("resolver_url is set, ignoring the static address table");
                }
                Arc::new(HttpResolver::new(url.clone(), settlement_timeout)?)
            }
            None => {
                let table = StaticResolver::from_table(&config.settlement.addresses)
                    .map_err(|e| anyhow::anyhow!("settlement.addresses: {e}"))?;
                tracing::info!(agents = table.len(), "using static address table");
                Arc::new(table)
            }
        };

        let facilitator: Option<Arc<dyn Facilitator>> = match &config.payment.facilitator_url {
            Some(url) => Some(Arc::new(HttpFacilitator::new(
                url.clone(),
                Duration::from_millis(config.payment.timeout_ms),
            )?)),
            None => None,
        };
        let gate = PaymentGate::new(config.gate_config(), facilitator)?;
        if gate.mode() == VerificationMode::Disabled {
            tracing::warn!("payment verification is DISABLED, paid routes accept requests without proof");
        }

        let events = Arc::new(EventHub::new(EVENT_CAPACITY));
        let settler = Arc::new(Settler::new(escrow.clone(), resolver));
        let engine: Arc<dyn ChannelEngine> = Arc::new(LedgerEngine::new(
            store,
            settler,
            events.clone(),
            config.engine_config()?,
        ));

        let reconciler = Arc::new(SettlementReconciler::new(
            engine.clone(),
            Duration::from_secs(config.settlement.retry_interval_secs),
            settlement_timeout,
        ));

        let state = Arc::new(AppState {
            engine,
            gate: Arc::new(gate),
            escrow,
            backend: config.storage.backend,
            start_time: Instant::now(),
            op_timeout: config.operation_timeout(),
        });

        let (shutdown_tx, _) = watch::channel(false);
        tracing::info!(backend = config.storage.backend.as_str(), "AEL node created");

        Ok(Self {
            config,
            state,
            events,
            reconciler,
            shutdown_tx,
            api_task: None,
            reconciler_task: None,
            local_addr: None,
        })
    }

    /// Bind the API listener and spawn the API server and reconciler.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting AEL node");

        let addr = self.config.api_socket_addr()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        self.local_addr = Some(listener.local_addr()?);

        let api_state = self.state.clone();
        let api_shutdown = self.shutdown_tx.subscribe();
        self.api_task = Some(tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(listener, api_state, api_shutdown).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        }));

        let reconciler = self.reconciler.clone();
        let reconciler_shutdown = self.shutdown_tx.subscribe();
        self.reconciler_task = Some(tokio::spawn(reconciler.run(reconciler_shutdown)));

        Ok(())
    }

    /// Wait until the API server exits.
    pub async fn run(&mut self) -> Result<()> {
        let task = self
            .api_task
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;
        task.await?;
        Ok(())
    }

    /// Signal every task to stop and wait for in-flight work to finish.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("shutting down AEL node");
        self.shutdown_tx.send_replace(true);

        if let Some(task) = self.api_task.take() {
            task.await?;
        }
        if let Some(task) = self.reconciler_task.take() {
            task.await?;
        }

        tracing::info!("AEL node shut down");
        Ok(())
    }

    /// Address the API is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn engine(&self) -> &Arc<dyn ChannelEngine> {
        &self.state.engine
    }

    pub fn events(&self) -> &Arc<EventHub> {
        &self.events
    }
}
