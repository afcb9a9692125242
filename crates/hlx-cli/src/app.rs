//! Wiring: config -> session, transport and gateways.

use crate::config::AppConfig;
use crate::error::AppResult;
use hlx_exchange::{ExchangeClient, KeyManager};
use hlx_info::InfoClient;
use hlx_telemetry::PrometheusObserver;
use hlx_transport::{DynTransport, HttpTransport, Session};
use std::sync::Arc;
use tracing::info;

pub struct Application {
    config: AppConfig,
    session: Arc<Session>,
    transport: DynTransport,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let mut session = Session::new(config.network.clone());
        if let Some(account) = config.account_address()? {
            session = session.with_account_address(account);
        }
        if let Some(vault) = config.vault_address()? {
            session = session.with_vault_address(vault);
        }

        let session = Arc::new(session);
        let transport = HttpTransport::with_timeout(Arc::clone(&session), config.request_timeout())?
            .with_observer(Arc::new(PrometheusObserver));

        info!(network = %config.network, "Session created");
        Ok(Self {
            config,
            session,
            transport: Arc::new(transport),
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Unsigned queries; metadata is fetched on demand.
    pub fn info(&self) -> InfoClient {
        InfoClient::new(Arc::clone(&self.session), Arc::clone(&self.transport))
    }

    /// Load the key, fetch the asset catalog and build a trading client.
    pub async fn exchange(&self) -> AppResult<ExchangeClient> {
        let keys = KeyManager::load(
            Some(self.config.key_source()),
            self.config.signer_address()?,
        )?;
        let catalog = self.info().asset_catalog().await?;
        let client = ExchangeClient::new(
            Arc::clone(&self.session),
            Arc::clone(&self.transport),
            Arc::new(keys),
            Arc::new(catalog),
        )?
        .with_observer(Arc::new(PrometheusObserver));
        Ok(client)
    }
}
