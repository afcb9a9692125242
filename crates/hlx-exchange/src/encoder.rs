//! Action encoder: caller requests in, validated wire actions out.
//!
//! Everything here is pure. Validation failures are reported before a
//! nonce is taken or anything is signed.

use crate::actions::{
    tpsl_wire, Action, BatchModify, BulkCancel, BulkCancelByCloid, BulkOrder, CancelByCloidWire,
    CancelWire, ModifyTarget, ModifyWire, OrderTypeWire, OrderWire, ScheduleCancel, SetReferrer,
    SpotSend, TriggerOrderType, UpdateIsolatedMargin, UpdateLeverage, UsdClassTransfer, UsdSend,
    VaultTransfer, Withdraw3,
};
use crate::signer::{signature_chain_id, ActionSignature};
use alloy::primitives::Address;
use hlx_core::{
    address_to_wire, parse_address, to_micro_usd, wire_string, AssetCatalog, Cloid, MarketKind,
    MarketSpec, Oid, OrderKind, OrderRef, OrderRequest, SpotToken, ValidationError,
};
use hlx_transport::Network;
use rust_decimal::Decimal;
use serde::Serialize;

/// Signed request body for `/exchange`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEnvelope<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    pub signature: ActionSignature,
    /// Omitted for personal trading and for user-signed actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_address: Option<String>,
}

impl ActionEnvelope<'_> {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

fn positive(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositive { field, value });
    }
    Ok(value)
}

/// Resolve the market and turn an order request into its wire form.
///
/// Size is truncated to `sz_decimals` and prices to the market's tick
/// rules; a value that truncates to zero is rejected.
pub fn order_wire(order: &OrderRequest, catalog: &AssetCatalog) -> Result<OrderWire, ValidationError> {
    let spec = catalog.resolve(&order.coin)?;
    order_wire_for(order, spec)
}

pub fn order_wire_for(order: &OrderRequest, spec: &MarketSpec) -> Result<OrderWire, ValidationError> {
    let sz = spec.format_size(order.size)?;
    let limit_px = spec.format_price(order.limit_price)?;
    let order_type = match order.order_type {
        OrderKind::Limit { tif } => OrderTypeWire::limit(tif),
        OrderKind::Trigger {
            trigger_price,
            is_market,
            tpsl,
        } => OrderTypeWire::Trigger {
            trigger: TriggerOrderType {
                is_market,
                trigger_px: spec.format_price(trigger_price)?,
                tpsl: tpsl_wire(tpsl).to_string(),
            },
        },
    };

    Ok(OrderWire {
        asset: spec.asset,
        is_buy: order.is_buy,
        limit_px,
        sz,
        reduce_only: order.reduce_only,
        order_type,
        cloid: order.cloid.as_ref().map(wire_cloid).transpose()?,
    })
}

fn wire_cloid(cloid: &Cloid) -> Result<String, ValidationError> {
    Ok(cloid.validate()?.to_wire())
}

pub fn place_orders(orders: &[OrderRequest], catalog: &AssetCatalog) -> Result<Action, ValidationError> {
    if orders.is_empty() {
        return Err(ValidationError::Empty("orders"));
    }
    let wires = orders
        .iter()
        .map(|o| order_wire(o, catalog))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Action::Order(BulkOrder::new(wires)))
}

pub fn cancel(cancels: &[(u32, Oid)]) -> Result<Action, ValidationError> {
    if cancels.is_empty() {
        return Err(ValidationError::Empty("cancels"));
    }
    Ok(Action::Cancel(BulkCancel {
        cancels: cancels
            .iter()
            .map(|&(asset, oid)| CancelWire { asset, oid })
            .collect(),
    }))
}

pub fn cancel_by_cloid(asset: u32, cloid: &Cloid) -> Result<Action, ValidationError> {
    Ok(Action::CancelByCloid(BulkCancelByCloid {
        cancels: vec![CancelByCloidWire {
            asset,
            cloid: wire_cloid(cloid)?,
        }],
    }))
}

/// The replacement keeps the target's cloid unless it names its own.
fn modify_wire(
    target: &OrderRef,
    order: &OrderRequest,
    catalog: &AssetCatalog,
) -> Result<ModifyWire, ValidationError> {
    let mut wire = order_wire(order, catalog)?;
    let oid = match target {
        OrderRef::Oid(oid) => ModifyTarget::Oid(*oid),
        OrderRef::Cloid(cloid) => {
            let cloid = wire_cloid(cloid)?;
            wire.cloid.get_or_insert_with(|| cloid.clone());
            ModifyTarget::Cloid(cloid)
        }
    };
    Ok(ModifyWire { oid, order: wire })
}

pub fn modify(
    target: &OrderRef,
    order: &OrderRequest,
    catalog: &AssetCatalog,
) -> Result<Action, ValidationError> {
    Ok(Action::Modify(modify_wire(target, order, catalog)?))
}

pub fn batch_modify(
    modifies: &[(OrderRef, OrderRequest)],
    catalog: &AssetCatalog,
) -> Result<Action, ValidationError> {
    if modifies.is_empty() {
        return Err(ValidationError::Empty("modifies"));
    }
    let modifies = modifies
        .iter()
        .map(|(target, order)| modify_wire(target, order, catalog))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Action::BatchModify(BatchModify { modifies }))
}

/// Leverage must lie in `1..=max_leverage`; spot markets have none.
pub fn update_leverage(spec: &MarketSpec, leverage: u32, is_cross: bool) -> Result<Action, ValidationError> {
    if spec.kind() != MarketKind::Perp {
        return Err(ValidationError::UnknownMarket(spec.symbol.to_string()));
    }
    let max = spec.max_leverage.unwrap_or(u32::MAX);
    if leverage == 0 || leverage > max {
        return Err(ValidationError::Leverage { leverage, max });
    }
    Ok(Action::UpdateLeverage(UpdateLeverage {
        asset: spec.asset,
        is_cross,
        leverage,
    }))
}

/// `amount` is a signed USD delta: positive adds margin, negative removes it.
pub fn update_isolated_margin(spec: &MarketSpec, is_buy: bool, amount: Decimal) -> Result<Action, ValidationError> {
    if spec.kind() != MarketKind::Perp {
        return Err(ValidationError::UnknownMarket(spec.symbol.to_string()));
    }
    if amount.is_zero() {
        return Err(ValidationError::Zero { field: "margin" });
    }
    Ok(Action::UpdateIsolatedMargin(UpdateIsolatedMargin {
        asset: spec.asset,
        is_buy,
        ntli: to_micro_usd("margin", amount)?,
    }))
}

fn destination(address: &str) -> Result<String, ValidationError> {
    Ok(address_to_wire(&parse_address(address)?))
}

/// `time` is called once every field has validated, so a rejected
/// transfer never consumes a nonce.
pub fn usd_send(
    network: &Network,
    to: &str,
    amount: Decimal,
    time: impl FnOnce() -> u64,
) -> Result<Action, ValidationError> {
    let destination = destination(to)?;
    let amount = wire_string(positive("amount", amount)?);
    Ok(Action::UsdSend(UsdSend {
        signature_chain_id: signature_chain_id(),
        hyperliquid_chain: network.hyperliquid_chain().to_string(),
        destination,
        amount,
        time: time(),
    }))
}

pub fn spot_send(
    network: &Network,
    to: &str,
    token: &SpotToken,
    amount: Decimal,
    time: impl FnOnce() -> u64,
) -> Result<Action, ValidationError> {
    let destination = destination(to)?;
    let amount = wire_string(positive("amount", amount)?);
    Ok(Action::SpotSend(SpotSend {
        signature_chain_id: signature_chain_id(),
        hyperliquid_chain: network.hyperliquid_chain().to_string(),
        destination,
        token: token.wire(),
        amount,
        time: time(),
    }))
}

pub fn withdraw(
    network: &Network,
    to: &str,
    amount: Decimal,
    time: impl FnOnce() -> u64,
) -> Result<Action, ValidationError> {
    let destination = destination(to)?;
    let amount = wire_string(positive("amount", amount)?);
    Ok(Action::Withdraw3(Withdraw3 {
        signature_chain_id: signature_chain_id(),
        hyperliquid_chain: network.hyperliquid_chain().to_string(),
        destination,
        amount,
        time: time(),
    }))
}

/// Move USDC between the spot and perp balances.
///
/// When acting for a vault the amount names it as a subaccount, since
/// user-signed actions carry no `vaultAddress`.
pub fn usd_class_transfer(
    network: &Network,
    amount: Decimal,
    to_perp: bool,
    nonce: impl FnOnce() -> u64,
    vault: Option<Address>,
) -> Result<Action, ValidationError> {
    let mut amount = wire_string(positive("amount", amount)?);
    if let Some(vault) = vault {
        amount = format!("{amount} subaccount:{}", address_to_wire(&vault));
    }
    Ok(Action::UsdClassTransfer(UsdClassTransfer {
        signature_chain_id: signature_chain_id(),
        hyperliquid_chain: network.hyperliquid_chain().to_string(),
        amount,
        to_perp,
        nonce: nonce(),
    }))
}

/// `time` must be strictly after `now`.
pub fn schedule_cancel(time: u64, now: u64) -> Result<Action, ValidationError> {
    if time <= now {
        return Err(ValidationError::NotInFuture { time, now });
    }
    Ok(Action::ScheduleCancel(ScheduleCancel { time: Some(time) }))
}

pub fn clear_scheduled_cancel() -> Action {
    Action::ScheduleCancel(ScheduleCancel { time: None })
}

pub fn vault_transfer(vault: &str, is_deposit: bool, usd: Decimal) -> Result<Action, ValidationError> {
    let micro = to_micro_usd("usd", positive("usd", usd)?)?;
    Ok(Action::VaultTransfer(VaultTransfer {
        vault_address: destination(vault)?,
        is_deposit,
        usd: micro.unsigned_abs(),
    }))
}

pub fn set_referrer(code: &str) -> Result<Action, ValidationError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::Empty("referral code"));
    }
    Ok(Action::SetReferrer(SetReferrer {
        code: code.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlx_core::{OrderSide, Price, Size, Symbol, TimeInForce, Tpsl, SPOT_ASSET_OFFSET};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn catalog() -> AssetCatalog {
        let mut c = AssetCatalog::new();
        c.insert_market(MarketSpec {
            symbol: Symbol::perp("BTC"),
            wire_name: "BTC".into(),
            asset: 0,
            sz_decimals: 5,
            max_leverage: Some(50),
        });
        c.insert_market(MarketSpec {
            symbol: Symbol::spot("PURR"),
            wire_name: "PURR/USDC".into(),
            asset: SPOT_ASSET_OFFSET,
            sz_decimals: 0,
            max_leverage: None,
        });
        c
    }

    fn btc_buy(size: Decimal, px: Decimal) -> OrderRequest {
        OrderRequest::limit(
            "BTC-PERP",
            OrderSide::Buy,
            Size::new(size),
            Price::new(px),
            TimeInForce::GoodTilCancelled,
        )
    }

    #[test]
    fn test_order_wire_truncates() {
        let wire = order_wire(&btc_buy(dec!(0.0123456), dec!(30123.45)), &catalog()).unwrap();
        assert_eq!(wire.sz, "0.01234");
        assert_eq!(wire.limit_px, "30123");
        assert_eq!(wire.asset, 0);
        assert!(wire.cloid.is_none());
    }

    #[test]
    fn test_order_wire_rejects_bad_input() {
        let c = catalog();
        assert!(matches!(
            order_wire(&btc_buy(dec!(0), dec!(100)), &c),
            Err(ValidationError::NonPositive { field: "size", .. })
        ));
        assert!(matches!(
            order_wire(&btc_buy(dec!(0.000001), dec!(100)), &c),
            Err(ValidationError::Precision { field: "size", .. })
        ));
        let mut unknown = btc_buy(dec!(1), dec!(1));
        unknown.coin = "DOGE-PERP".into();
        assert!(matches!(
            order_wire(&unknown, &c),
            Err(ValidationError::UnknownMarket(_))
        ));
    }

    #[test]
    fn test_trigger_order_wire() {
        let order = OrderRequest::trigger(
            "BTC-PERP",
            OrderSide::Sell,
            Size::new(dec!(0.5)),
            Price::new(dec!(29000)),
            Price::new(dec!(29500.5)),
            true,
            Tpsl::Sl,
        )
        .reduce_only(true)
        .with_cloid("stop-1");
        let wire = order_wire(&order, &catalog()).unwrap();
        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            value["t"],
            json!({"trigger": {"isMarket": true, "triggerPx": "29500", "tpsl": "sl"}})
        );
        assert_eq!(value["r"], json!(true));
        assert_eq!(wire.cloid, Some(Cloid::new("stop-1").to_wire()));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let c = catalog();
        let order = btc_buy(dec!(0.1), dec!(30000)).with_cloid("abc");
        let a = place_orders(&[order.clone()], &c).unwrap();
        let b = place_orders(&[order], &c).unwrap();
        assert_eq!(
            rmp_serde::to_vec_named(&a).unwrap(),
            rmp_serde::to_vec_named(&b).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_modify_by_cloid_carries_cloid() {
        let c = catalog();
        let target = OrderRef::Cloid(Cloid::new("keep"));
        let Action::Modify(plain) = modify(&target, &btc_buy(dec!(1), dec!(30000)), &c).unwrap()
        else {
            panic!("wrong action");
        };
        assert_eq!(plain.order.cloid, Some(Cloid::new("keep").to_wire()));

        let renamed = btc_buy(dec!(1), dec!(30000)).with_cloid("other");
        let Action::Modify(own) = modify(&target, &renamed, &c).unwrap() else {
            panic!("wrong action");
        };
        assert_eq!(own.order.cloid, Some(Cloid::new("other").to_wire()));

        let Action::Modify(by_oid) =
            modify(&OrderRef::Oid(7), &btc_buy(dec!(1), dec!(30000)), &c).unwrap()
        else {
            panic!("wrong action");
        };
        assert!(by_oid.order.cloid.is_none());
    }

    #[test]
    fn test_blank_cloid_rejected() {
        let c = catalog();
        assert!(matches!(
            order_wire(&btc_buy(dec!(1), dec!(30000)).with_cloid(" "), &c),
            Err(ValidationError::Empty("cloid"))
        ));
        assert!(cancel_by_cloid(0, &Cloid::new("")).is_err());
        assert!(modify(
            &OrderRef::Cloid(Cloid::new("")),
            &btc_buy(dec!(1), dec!(30000)),
            &c
        )
        .is_err());
    }

    #[test]
    fn test_leverage_bounds() {
        let c = catalog();
        let btc = c.resolve("BTC-PERP").unwrap();
        assert!(update_leverage(btc, 10, true).is_ok());
        assert!(matches!(
            update_leverage(btc, 0, true),
            Err(ValidationError::Leverage { leverage: 0, max: 50 })
        ));
        assert!(update_leverage(btc, 51, false).is_err());
        assert!(update_leverage(c.resolve("PURR-SPOT").unwrap(), 2, true).is_err());
    }

    #[test]
    fn test_isolated_margin_is_signed() {
        let c = catalog();
        let btc = c.resolve("BTC-PERP").unwrap();
        let Action::UpdateIsolatedMargin(add) = update_isolated_margin(btc, true, dec!(2.5)).unwrap()
        else {
            panic!("wrong action");
        };
        assert_eq!(add.ntli, 2_500_000);
        let Action::UpdateIsolatedMargin(remove) =
            update_isolated_margin(btc, true, dec!(-1)).unwrap()
        else {
            panic!("wrong action");
        };
        assert_eq!(remove.ntli, -1_000_000);
        assert!(matches!(
            update_isolated_margin(btc, true, dec!(0)),
            Err(ValidationError::Zero { .. })
        ));
    }

    #[test]
    fn test_transfers() {
        let to = "0x440E80A60d04788a7cEd5DF27c90F1bcbD131355";
        let action = usd_send(&Network::Testnet, to, dec!(1.50), || 99).unwrap();
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "usdSend",
                "signatureChainId": "0x66eee",
                "hyperliquidChain": "Testnet",
                "destination": "0x440e80a60d04788a7ced5df27c90f1bcbd131355",
                "amount": "1.5",
                "time": 99
            })
        );
        assert_eq!(action.embedded_nonce(), Some(99));

        assert!(matches!(
            usd_send(&Network::Mainnet, to, dec!(-1), || 1),
            Err(ValidationError::NonPositive { .. })
        ));
        assert!(matches!(
            withdraw(&Network::Mainnet, "0x1234", dec!(1), || 1),
            Err(ValidationError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_rejected_transfer_takes_no_nonce() {
        let to = "0x440E80A60d04788a7cEd5DF27c90F1bcbD131355";
        let taken = std::cell::Cell::new(0);
        let next = || {
            taken.set(taken.get() + 1);
            42
        };
        assert!(usd_send(&Network::Mainnet, to, dec!(0), next).is_err());
        assert!(withdraw(&Network::Mainnet, "nope", dec!(1), next).is_err());
        assert!(usd_class_transfer(&Network::Mainnet, dec!(-3), true, next, None).is_err());
        assert_eq!(taken.get(), 0);

        assert!(usd_send(&Network::Mainnet, to, dec!(1), next).is_ok());
        assert_eq!(taken.get(), 1);
    }

    #[test]
    fn test_class_transfer_names_vault() {
        let vault = parse_address("0x579c050b23a4250c834f4176f89f1bc30cb4acf1").unwrap();
        let Action::UsdClassTransfer(t) =
            usd_class_transfer(&Network::Mainnet, dec!(10), false, || 7, Some(vault)).unwrap()
        else {
            panic!("wrong action");
        };
        assert_eq!(
            t.amount,
            "10 subaccount:0x579c050b23a4250c834f4176f89f1bc30cb4acf1"
        );
        assert_eq!(t.hyperliquid_chain, "Mainnet");
    }

    #[test]
    fn test_schedule_cancel_must_be_future() {
        assert!(matches!(
            schedule_cancel(1_000, 1_000),
            Err(ValidationError::NotInFuture { .. })
        ));
        assert!(schedule_cancel(1_001, 1_000).is_ok());
        assert_eq!(
            serde_json::to_value(clear_scheduled_cancel()).unwrap(),
            json!({"type": "scheduleCancel"})
        );
    }

    #[test]
    fn test_vault_transfer_and_referrer() {
        let action =
            vault_transfer("0x579c050b23a4250c834f4176f89f1bc30cb4acf1", true, dec!(1)).unwrap();
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "type": "vaultTransfer",
                "vaultAddress": "0x579c050b23a4250c834f4176f89f1bc30cb4acf1",
                "isDeposit": true,
                "usd": 1000000
            })
        );
        assert!(matches!(
            set_referrer("  "),
            Err(ValidationError::Empty(_))
        ));
    }

    #[test]
    fn test_envelope_shape() {
        let action = set_referrer("CODE").unwrap();
        let envelope = ActionEnvelope {
            action: &action,
            nonce: 5,
            signature: ActionSignature {
                r: "0x01".into(),
                s: "0x02".into(),
                v: 27,
            },
            vault_address: None,
        };
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"action":{"type":"setReferrer","code":"CODE"},"nonce":5,"signature":{"r":"0x01","s":"0x02","v":27}}"#
        );
    }
}
