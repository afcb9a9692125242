//! Wire format of every signed action.
//!
//! IMPORTANT: field order is part of the signature. `rmp_serde::to_vec_named`
//! writes struct fields in declaration order, and the exchange hashes the
//! same bytes. `Option<T>` fields must use `skip_serializing_if` so absent
//! keys are omitted instead of encoded as `nil`.

use hlx_core::{TimeInForce, Tpsl};
use serde::Serialize;

/// Wire spelling of a take-profit / stop-loss flag.
pub fn tpsl_wire(tpsl: Tpsl) -> &'static str {
    match tpsl {
        Tpsl::Tp => "tp",
        Tpsl::Sl => "sl",
    }
}

/// How an action is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// msgpack hash wrapped in a phantom agent.
    L1,
    /// EIP-712 typed data signed directly by the user.
    UserSigned,
}

/// Every action the exchange gateway can send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order(BulkOrder),
    Cancel(BulkCancel),
    CancelByCloid(BulkCancelByCloid),
    Modify(ModifyWire),
    BatchModify(BatchModify),
    UpdateLeverage(UpdateLeverage),
    UpdateIsolatedMargin(UpdateIsolatedMargin),
    UsdSend(UsdSend),
    SpotSend(SpotSend),
    Withdraw3(Withdraw3),
    UsdClassTransfer(UsdClassTransfer),
    ScheduleCancel(ScheduleCancel),
    VaultTransfer(VaultTransfer),
    SetReferrer(SetReferrer),
}

impl Action {
    pub fn kind(&self) -> SigningScheme {
        match self {
            Self::UsdSend(_) | Self::SpotSend(_) | Self::Withdraw3(_) | Self::UsdClassTransfer(_) => {
                SigningScheme::UserSigned
            }
            Self::Order(_)
            | Self::Cancel(_)
            | Self::CancelByCloid(_)
            | Self::Modify(_)
            | Self::BatchModify(_)
            | Self::UpdateLeverage(_)
            | Self::UpdateIsolatedMargin(_)
            | Self::ScheduleCancel(_)
            | Self::VaultTransfer(_)
            | Self::SetReferrer(_) => SigningScheme::L1,
        }
    }

    /// Value of the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Order(_) => "order",
            Self::Cancel(_) => "cancel",
            Self::CancelByCloid(_) => "cancelByCloid",
            Self::Modify(_) => "modify",
            Self::BatchModify(_) => "batchModify",
            Self::UpdateLeverage(_) => "updateLeverage",
            Self::UpdateIsolatedMargin(_) => "updateIsolatedMargin",
            Self::UsdSend(_) => "usdSend",
            Self::SpotSend(_) => "spotSend",
            Self::Withdraw3(_) => "withdraw3",
            Self::UsdClassTransfer(_) => "usdClassTransfer",
            Self::ScheduleCancel(_) => "scheduleCancel",
            Self::VaultTransfer(_) => "vaultTransfer",
            Self::SetReferrer(_) => "setReferrer",
        }
    }

    /// Nonce carried inside a user-signed action (`time` or `nonce`).
    ///
    /// The envelope nonce must equal it.
    pub fn embedded_nonce(&self) -> Option<u64> {
        match self {
            Self::UsdSend(a) => Some(a.time),
            Self::SpotSend(a) => Some(a.time),
            Self::Withdraw3(a) => Some(a.time),
            Self::UsdClassTransfer(a) => Some(a.nonce),
            _ => None,
        }
    }

    /// Typed-data view of a user-signed action.
    pub fn user_signed_data(&self) -> Option<UserSignedData<'_>> {
        use TypedValue::{Bool, String as Str, Uint64};
        let (primary_type, fields) = match self {
            Self::UsdSend(a) => (
                "UsdSend",
                vec![
                    ("hyperliquidChain", Str(&a.hyperliquid_chain)),
                    ("destination", Str(&a.destination)),
                    ("amount", Str(&a.amount)),
                    ("time", Uint64(a.time)),
                ],
            ),
            Self::SpotSend(a) => (
                "SpotSend",
                vec![
                    ("hyperliquidChain", Str(&a.hyperliquid_chain)),
                    ("destination", Str(&a.destination)),
                    ("token", Str(&a.token)),
                    ("amount", Str(&a.amount)),
                    ("time", Uint64(a.time)),
                ],
            ),
            Self::Withdraw3(a) => (
                "Withdraw",
                vec![
                    ("hyperliquidChain", Str(&a.hyperliquid_chain)),
                    ("destination", Str(&a.destination)),
                    ("amount", Str(&a.amount)),
                    ("time", Uint64(a.time)),
                ],
            ),
            Self::UsdClassTransfer(a) => (
                "UsdClassTransfer",
                vec![
                    ("hyperliquidChain", Str(&a.hyperliquid_chain)),
                    ("amount", Str(&a.amount)),
                    ("toPerp", Bool(a.to_perp)),
                    ("nonce", Uint64(a.nonce)),
                ],
            ),
            _ => return None,
        };
        Some(UserSignedData {
            primary_type,
            fields,
        })
    }
}

/// One EIP-712 field value of a user-signed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedValue<'a> {
    String(&'a str),
    Uint64(u64),
    Bool(bool),
}

impl TypedValue<'_> {
    pub fn sol_type(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Uint64(_) => "uint64",
            Self::Bool(_) => "bool",
        }
    }
}

/// Fields of a `HyperliquidTransaction:<primary_type>` struct, in type order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSignedData<'a> {
    pub primary_type: &'static str,
    pub fields: Vec<(&'static str, TypedValue<'a>)>,
}

impl UserSignedData<'_> {
    /// EIP-712 type string, e.g.
    /// `HyperliquidTransaction:UsdSend(string hyperliquidChain,...,uint64 time)`.
    pub fn type_string(&self) -> String {
        let members: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{} {}", value.sol_type(), name))
            .collect();
        format!(
            "HyperliquidTransaction:{}({})",
            self.primary_type,
            members.join(",")
        )
    }
}

/// Order wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "b")]
    pub is_buy: bool,

    /// Limit price as string
    #[serde(rename = "p")]
    pub limit_px: String,

    /// Size as string
    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    /// Client order ID, wire form
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub cloid: Option<String>,
}

/// `{"limit": {"tif": ..}}` or `{"trigger": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderTypeWire {
    Limit { limit: LimitOrderType },
    Trigger { trigger: TriggerOrderType },
}

impl OrderTypeWire {
    pub fn limit(tif: TimeInForce) -> Self {
        Self::Limit {
            limit: LimitOrderType {
                tif: tif.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LimitOrderType {
    /// "Gtc", "Ioc" or "Alo"
    pub tif: String,
}

/// Field order: isMarket, triggerPx, tpsl.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerOrderType {
    #[serde(rename = "isMarket")]
    pub is_market: bool,

    #[serde(rename = "triggerPx")]
    pub trigger_px: String,

    /// "tp" or "sl"
    pub tpsl: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOrder {
    pub orders: Vec<OrderWire>,
    /// Always `"na"`: orders are not linked.
    pub grouping: String,
}

impl BulkOrder {
    pub fn new(orders: Vec<OrderWire>) -> Self {
        Self {
            orders,
            grouping: "na".to_string(),
        }
    }
}

/// `{"a": asset, "o": oid}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCancel {
    pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCancelByCloid {
    pub cancels: Vec<CancelByCloidWire>,
}

/// Order to modify: exchange oid or cloid hex.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModifyTarget {
    Oid(u64),
    Cloid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifyWire {
    pub oid: ModifyTarget,
    pub order: OrderWire,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchModify {
    pub modifies: Vec<ModifyWire>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeverage {
    pub asset: u32,
    pub is_cross: bool,
    pub leverage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIsolatedMargin {
    pub asset: u32,
    pub is_buy: bool,
    /// Signed micro-USD delta.
    pub ntli: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdSend {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSend {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    /// `NAME:0x<token id>`
    pub token: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw3 {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    pub time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdClassTransfer {
    pub signature_chain_id: String,
    pub hyperliquid_chain: String,
    pub amount: String,
    pub to_perp: bool,
    pub nonce: u64,
}

/// `time` omitted clears a scheduled cancel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleCancel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultTransfer {
    pub vault_address: String,
    pub is_deposit: bool,
    /// Micro-USD.
    pub usd: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetReferrer {
    pub code: String,
}
