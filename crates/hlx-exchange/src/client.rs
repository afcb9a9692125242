//! Exchange gateway: validated, signed actions against `/exchange`.
//!
//! Every method runs the same pipeline: validate and encode, take a
//! nonce, sign, POST once, interpret the response. Validation failures
//! return before a nonce is taken. Nothing is retried; see
//! [`ExchangeError::outcome`] for what a failure means.

use crate::actions::{Action, SigningScheme};
use crate::encoder::{self, ActionEnvelope};
use crate::error::{ExchangeError, ExchangeResult};
use crate::registry::{OrderRecord, OrderRegistry};
use crate::response::{item_error, ExchangeResponse, OrderOutcome};
use crate::signer::{KeyManager, Signer};
use hlx_core::{
    address_to_wire, AssetCatalog, Cloid, Oid, OrderEvent, OrderRef, OrderRequest, OrderState,
    ValidationError,
};
use hlx_info::InfoClient;
use hlx_transport::{DynTransport, Endpoint, NoopObserver, RequestObserver, Session};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ExchangeClient {
    session: Arc<Session>,
    transport: DynTransport,
    signer: Signer,
    catalog: Arc<AssetCatalog>,
    info: InfoClient,
    registry: OrderRegistry,
    observer: Arc<dyn RequestObserver>,
}

impl ExchangeClient {
    /// The signer follows the session's network; `catalog` resolves every
    /// symbol this client is asked to trade.
    ///
    /// A transport bound to a different network than `session` is refused,
    /// so an action is never signed for one network and sent to another.
    pub fn new(
        session: Arc<Session>,
        transport: DynTransport,
        keys: Arc<KeyManager>,
        catalog: Arc<AssetCatalog>,
    ) -> ExchangeResult<Self> {
        if let Some(target) = transport.network() {
            if target != session.network() {
                return Err(ValidationError::Other(format!(
                    "transport targets {target}, session signs for {}",
                    session.network()
                ))
                .into());
            }
        }
        let signer = Signer::new(keys, session.network().is_mainnet())?;
        let info = InfoClient::new(Arc::clone(&session), Arc::clone(&transport))
            .with_catalog(Arc::clone(&catalog));
        info!(
            network = %session.network(),
            address = ?signer.address(),
            vault = ?session.vault_address(),
            markets = catalog.len(),
            "Exchange client ready"
        );
        Ok(Self {
            session,
            transport,
            signer,
            catalog,
            info,
            registry: OrderRegistry::new(),
            observer: Arc::new(NoopObserver),
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn catalog(&self) -> &Arc<AssetCatalog> {
        &self.catalog
    }

    /// Info gateway sharing this client's session, transport and catalog.
    pub fn info(&self) -> &InfoClient {
        &self.info
    }

    pub fn registry(&self) -> &OrderRegistry {
        &self.registry
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderOutcome> {
        let mut outcomes = self.place_orders(std::slice::from_ref(order)).await?;
        outcomes
            .pop()
            .ok_or_else(|| ExchangeError::decode("empty order response"))
    }

    /// Place several orders in one signed action.
    ///
    /// Outcomes are aligned with `orders`; one rejected order does not
    /// fail the others.
    pub async fn place_orders(&self, orders: &[OrderRequest]) -> ExchangeResult<Vec<OrderOutcome>> {
        let action = encoder::place_orders(orders, &self.catalog)?;
        let result = self
            .submit(&action)
            .await
            .and_then(|response| response.order_outcomes(orders.len()));
        self.record(&action, &result);
        let outcomes = result?;

        for (order, outcome) in orders.iter().zip(&outcomes) {
            self.track_placement(order, outcome);
        }
        Ok(outcomes)
    }

    fn track_placement(&self, order: &OrderRequest, outcome: &OrderOutcome) {
        let cloid = order.cloid.as_ref().map(Cloid::to_wire);
        let (oid, state) = match outcome {
            OrderOutcome::Resting { oid, .. } => (Some(*oid), OrderState::Resting),
            OrderOutcome::Filled { oid, .. } => (Some(*oid), OrderState::Filled),
            OrderOutcome::Pending { .. } => (None, OrderState::Submitted),
            OrderOutcome::Error { reason } => {
                warn!(coin = %order.coin, cloid = ?cloid, %reason, "Order rejected");
                (None, OrderState::Rejected)
            }
        };
        self.registry.insert(OrderRecord {
            oid,
            cloid,
            coin: order.coin.clone(),
            state,
        });
    }

    /// Cancel one order by exchange id.
    ///
    /// Fails with `OrderNotFound` when the order is already terminal, either
    /// in the local registry (nothing is sent) or according to the exchange.
    pub async fn cancel_order(&self, coin: &str, oid: Oid) -> ExchangeResult<()> {
        let order = OrderRef::Oid(oid);
        let asset = self.catalog.resolve(coin)?.asset;
        if let Some(record) = self.registry.get(&order) {
            if record.state.is_terminal() {
                return Err(ExchangeError::OrderNotFound(format!(
                    "{order} is {}",
                    record.state
                )));
            }
        }

        let action = encoder::cancel(&[(asset, oid)])?;
        let result = self.submit_cancel(&action, &order).await;
        self.record(&action, &result);
        result
    }

    /// Cancel by cloid after confirming the order is still live.
    ///
    /// An order the exchange does not know, or one that already finished,
    /// fails with `OrderNotFound` and no cancel is sent.
    pub async fn cancel_order_by_cloid(&self, coin: &str, cloid: &Cloid) -> ExchangeResult<()> {
        let asset = self.catalog.resolve(coin)?.asset;
        let action = encoder::cancel_by_cloid(asset, cloid)?;
        let order = OrderRef::Cloid(cloid.clone());
        let user = self.default_user()?;

        let status = self
            .info
            .order_status(Some(&user), &order, false)
            .await?
            .normalized()
            .ok_or_else(|| ExchangeError::decode("orderStatus returned raw payload"))?;

        match status.state {
            Some(state) if status.is_known() && !state.is_terminal() => {}
            state => {
                debug!(%order, status = %status.status, ?state, "Cancel skipped");
                return Err(ExchangeError::OrderNotFound(format!(
                    "{order} is {}",
                    status.status
                )));
            }
        }

        let result = self.submit_cancel(&action, &order).await;
        self.record(&action, &result);
        result
    }

    async fn submit_cancel(&self, action: &Action, order: &OrderRef) -> ExchangeResult<()> {
        let response = self.submit(action).await?;
        let mut results = response.cancel_results(1)?;
        match results.pop() {
            Some(Ok(())) => {
                self.registry.apply(order, OrderEvent::Cancel);
                Ok(())
            }
            Some(Err(reason)) => {
                warn!(%order, %reason, "Cancel rejected");
                Err(item_error(reason))
            }
            None => Err(ExchangeError::decode("empty cancel response")),
        }
    }

    /// Cancel every open order, optionally only those of `coin`.
    ///
    /// Returns how many cancels the exchange accepted. Sends nothing when
    /// there is nothing open.
    pub async fn cancel_all_orders(&self, coin: Option<&str>) -> ExchangeResult<usize> {
        let filter = coin
            .map(|c| self.catalog.resolve(c).map(|spec| spec.symbol.to_string()))
            .transpose()?;
        let user = self.default_user()?;

        let open = self
            .info
            .user_open_orders(Some(&user), false)
            .await?
            .normalized()
            .ok_or_else(|| ExchangeError::decode("openOrders returned raw payload"))?;

        let targets = open
            .iter()
            .filter(|o| filter.as_ref().map_or(true, |f| &o.symbol == f))
            .map(|o| -> Result<(u32, Oid), ValidationError> {
                Ok((self.catalog.resolve(&o.symbol)?.asset, o.oid))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if targets.is_empty() {
            debug!(?coin, "No open orders to cancel");
            return Ok(0);
        }

        let action = encoder::cancel(&targets)?;
        let result = self
            .submit(&action)
            .await
            .and_then(|response| response.cancel_results(targets.len()));
        self.record(&action, &result);

        let mut cancelled = 0;
        for ((_, oid), item) in targets.iter().zip(result?) {
            match item {
                Ok(()) => {
                    self.registry.apply(&OrderRef::Oid(*oid), OrderEvent::Cancel);
                    cancelled += 1;
                }
                Err(reason) => warn!(oid, %reason, "Cancel rejected"),
            }
        }
        info!(cancelled, requested = targets.len(), "Cancelled open orders");
        Ok(cancelled)
    }

    /// Replace a resting order. The exchange re-rests it under a new oid.
    ///
    /// A replacement without its own cloid keeps the one the target was
    /// placed with.
    pub async fn modify_order(&self, target: &OrderRef, order: &OrderRequest) -> ExchangeResult<()> {
        let order = self.keep_cloid(target, order);
        let action = encoder::modify(target, &order, &self.catalog)?;
        let result = self.submit(&action).await.and_then(|response| {
            if response.data.is_none() {
                return Ok(None);
            }
            let mut outcomes = response.order_outcomes(1)?;
            Ok(outcomes.pop())
        });
        self.record(&action, &result);

        match result? {
            Some(OrderOutcome::Error { reason }) => {
                warn!(%target, %reason, "Modify rejected");
                Err(item_error(reason))
            }
            Some(outcome) => {
                self.track_modify(target, &outcome);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Modify several orders in one action; outcomes align with `modifies`.
    pub async fn batch_modify_orders(
        &self,
        modifies: &[(OrderRef, OrderRequest)],
    ) -> ExchangeResult<Vec<OrderOutcome>> {
        let resolved: Vec<_> = modifies
            .iter()
            .map(|(target, order)| (target.clone(), self.keep_cloid(target, order)))
            .collect();
        let action = encoder::batch_modify(&resolved, &self.catalog)?;
        let result = self
            .submit(&action)
            .await
            .and_then(|response| response.order_outcomes(modifies.len()));
        self.record(&action, &result);
        let outcomes = result?;

        for ((target, _), outcome) in modifies.iter().zip(&outcomes) {
            match outcome {
                OrderOutcome::Error { reason } => warn!(%target, %reason, "Modify rejected"),
                other => self.track_modify(target, other),
            }
        }
        Ok(outcomes)
    }

    /// Cloid targets are handled by the encoder; an oid target borrows the
    /// cloid of its registry record.
    fn keep_cloid(&self, target: &OrderRef, order: &OrderRequest) -> OrderRequest {
        let known = match target {
            OrderRef::Oid(_) if order.cloid.is_none() => {
                self.registry.get(target).and_then(|record| record.cloid)
            }
            _ => None,
        };
        match known {
            Some(cloid) => order.clone().with_cloid(cloid),
            None => order.clone(),
        }
    }

    fn track_modify(&self, target: &OrderRef, outcome: &OrderOutcome) {
        let applied = match outcome {
            OrderOutcome::Resting { oid, .. } => self.registry.repoint(target, *oid),
            OrderOutcome::Filled { .. } => self.registry.apply(target, OrderEvent::Fill),
            OrderOutcome::Pending { .. } | OrderOutcome::Error { .. } => None,
        };
        if let Some(Err(e)) = applied {
            warn!(%target, error = %e, "Registry out of step with exchange");
        }
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Leverage for `coin`, from 1 up to the market's maximum.
    pub async fn update_leverage(&self, coin: &str, leverage: u32, is_cross: bool) -> ExchangeResult<()> {
        let spec = self.catalog.resolve(coin)?;
        let action = encoder::update_leverage(spec, leverage, is_cross)?;
        self.submit_default(&action).await
    }

    /// Add (positive) or remove (negative) isolated margin, in USD.
    pub async fn update_isolated_margin(&self, coin: &str, is_buy: bool, amount: Decimal) -> ExchangeResult<()> {
        let spec = self.catalog.resolve(coin)?;
        let action = encoder::update_isolated_margin(spec, is_buy, amount)?;
        self.submit_default(&action).await
    }

    pub async fn usd_transfer(&self, destination: &str, amount: Decimal) -> ExchangeResult<()> {
        let action = encoder::usd_send(
            self.session.network(),
            destination,
            amount,
            || self.session.next_nonce(),
        )?;
        self.submit_default(&action).await
    }

    /// Send a spot token by name, e.g. `"PURR"`.
    pub async fn spot_transfer(&self, destination: &str, token: &str, amount: Decimal) -> ExchangeResult<()> {
        let token = self.catalog.token(token)?;
        let action = encoder::spot_send(
            self.session.network(),
            destination,
            token,
            amount,
            || self.session.next_nonce(),
        )?;
        self.submit_default(&action).await
    }

    /// Withdraw USDC to an address on the bridge chain.
    pub async fn initiate_withdrawal(&self, destination: &str, amount: Decimal) -> ExchangeResult<()> {
        let action = encoder::withdraw(
            self.session.network(),
            destination,
            amount,
            || self.session.next_nonce(),
        )?;
        self.submit_default(&action).await
    }

    pub async fn transfer_between_spot_and_perp(&self, amount: Decimal, to_perp: bool) -> ExchangeResult<()> {
        let action = encoder::usd_class_transfer(
            self.session.network(),
            amount,
            to_perp,
            || self.session.next_nonce(),
            self.session.vault_address(),
        )?;
        self.submit_default(&action).await
    }

    /// Ask the exchange to cancel all open orders at `time_ms`.
    ///
    /// `time_ms` must be after the session clock's now. Nothing is
    /// cancelled by this call itself.
    pub async fn schedule_cancel(&self, time_ms: u64) -> ExchangeResult<()> {
        let action = encoder::schedule_cancel(time_ms, self.session.now_ms())?;
        self.submit_default(&action).await
    }

    pub async fn schedule_cancel_clear(&self) -> ExchangeResult<()> {
        self.submit_default(&encoder::clear_scheduled_cancel()).await
    }

    pub async fn vault_transfer(&self, vault: &str, is_deposit: bool, usd: Decimal) -> ExchangeResult<()> {
        let action = encoder::vault_transfer(vault, is_deposit, usd)?;
        self.submit_default(&action).await
    }

    pub async fn set_referrer(&self, code: &str) -> ExchangeResult<()> {
        let action = encoder::set_referrer(code)?;
        self.submit_default(&action).await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    async fn submit_default(&self, action: &Action) -> ExchangeResult<()> {
        let result = self.submit(action).await.map(|_| ());
        self.record(action, &result);
        result
    }

    /// Sign and POST one action, and split the answer into ok or err.
    async fn submit(&self, action: &Action) -> ExchangeResult<ExchangeResponse> {
        let nonce = action
            .embedded_nonce()
            .unwrap_or_else(|| self.session.next_nonce());

        // User-signed actions never carry a vault, and a vault transfer is
        // signed by the depositor itself.
        let vault = match (action.kind(), action) {
            (SigningScheme::UserSigned, _) | (_, Action::VaultTransfer(_)) => None,
            (SigningScheme::L1, _) => self.session.vault_address(),
        };

        let signature = self.signer.sign(action, nonce, vault).await?;
        let envelope = ActionEnvelope {
            action,
            nonce,
            signature,
            vault_address: vault.as_ref().map(address_to_wire),
        };
        let body = envelope
            .to_json()
            .map_err(|e| ExchangeError::decode(format!("Failed to encode envelope: {e}")))?;

        info!(action = action.name(), nonce, vault = ?vault, "Submitting action");
        debug!(bytes = body.to_string().len(), "Exchange payload");

        let response = self.transport.post(Endpoint::Exchange, body).await?;
        ExchangeResponse::parse(response)
    }

    fn record<T>(&self, action: &Action, result: &ExchangeResult<T>) {
        let label = match result {
            Ok(_) => "ok",
            Err(e) => {
                warn!(
                    action = action.name(),
                    error = %e,
                    outcome = ?e.outcome(),
                    "Action failed"
                );
                e.label()
            }
        };
        self.observer.observe_action(action.name(), label);
    }

    /// Vault, else account, else the signing address.
    fn default_user(&self) -> ExchangeResult<String> {
        self.session
            .vault_address()
            .or_else(|| self.session.account_address())
            .or_else(|| self.signer.address())
            .map(|a| address_to_wire(&a))
            .ok_or_else(|| ValidationError::Empty("user address").into())
    }
}
