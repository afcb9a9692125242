//! Action signing.
//!
//! Two schemes:
//! 1. L1 actions: `action_hash` over msgpack + nonce + vault tag, then an
//!    EIP-712 signature of the phantom agent wrapping that hash.
//! 2. User-signed actions: EIP-712 typed data `HyperliquidTransaction:<Name>`
//!    signed directly.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as AlloySigner;
use alloy::sol;
use alloy::sol_types::eip712_domain;
use alloy::sol_types::SolStruct;
use serde::Serialize;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::actions::{Action, SigningScheme, TypedValue, UserSignedData};

// =============================================================================
// KeySource and KeyManager
// =============================================================================

/// Source of the private key.
#[derive(Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
    /// Hex key already in memory.
    Hex(Zeroizing<String>),
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVar { var_name } => f.debug_struct("EnvVar").field("var_name", var_name).finish(),
            Self::File { path } => f.debug_struct("File").field("path", path).finish(),
            Self::Hex(_) => f.write_str("Hex(<redacted>)"),
        }
    }
}

/// Holds the trading key.
///
/// Never log private key material.
pub struct KeyManager {
    trading_signer: Option<PrivateKeySigner>,
}

impl KeyManager {
    /// Load the key and, when given, check it derives `expected_address`.
    ///
    /// `None` builds a key-less manager; signing then fails with
    /// [`SignerError::NoTradingKey`].
    pub fn load(
        source: Option<KeySource>,
        expected_address: Option<Address>,
    ) -> Result<Self, KeyError> {
        let Some(source) = source else {
            return Ok(Self {
                trading_signer: None,
            });
        };

        // Supports 0x prefix and whitespace trimming
        fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>, KeyError> {
            let trimmed = hex_str.trim().trim_start_matches("0x");
            Ok(Zeroizing::new(hex::decode(trimmed)?))
        }

        let secret_bytes: Zeroizing<Vec<u8>> = match source {
            KeySource::EnvVar { ref var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| KeyError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { ref path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
            KeySource::Hex(ref hex) => parse_hex_key(hex)?,
        };

        Self::from_bytes(&secret_bytes, expected_address)
    }

    /// Build from raw key bytes.
    pub fn from_bytes(
        secret_bytes: &[u8],
        expected_address: Option<Address>,
    ) -> Result<Self, KeyError> {
        let signer = PrivateKeySigner::from_slice(secret_bytes)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected_address {
            if signer.address() != expected {
                return Err(KeyError::AddressMismatch {
                    expected,
                    actual: signer.address(),
                });
            }
        }

        Ok(Self {
            trading_signer: Some(signer),
        })
    }

    pub fn trading_signer(&self) -> Option<&PrivateKeySigner> {
        self.trading_signer.as_ref()
    }

    pub fn trading_address(&self) -> Option<Address> {
        self.trading_signer.as_ref().map(|s| s.address())
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("trading_address", &self.trading_address())
            .finish_non_exhaustive()
    }
}

/// Key management errors.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Failed to decode hex: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Address mismatch: expected {expected}, got {actual}")]
    AddressMismatch { expected: Address, actual: Address },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// SigningInput and action_hash
// =============================================================================

/// Signing input parameters.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    /// None = personal account, Some = acting for a vault
    pub vault_address: Option<Address>,
}

impl SigningInput<'_> {
    /// `keccak256(msgpack(action) ‖ nonce_be8 ‖ vault_tag)`
    pub fn action_hash(&self) -> Result<B256, SignerError> {
        let mut data = rmp_serde::to_vec_named(self.action)
            .map_err(|e| SignerError::SerializationFailed(e.to_string()))?;

        data.extend_from_slice(&self.nonce.to_be_bytes());

        // Even None has the 0x00 byte
        match &self.vault_address {
            None => data.push(0x00),
            Some(addr) => {
                data.push(0x01);
                data.extend_from_slice(addr.as_slice());
            }
        }

        Ok(keccak256(&data))
    }
}

// =============================================================================
// PhantomAgent and EIP-712 Signing
// =============================================================================

/// EIP-712 domain constants for L1 actions.
pub const EIP712_DOMAIN_NAME: &str = "Exchange";
pub const EIP712_DOMAIN_VERSION: &str = "1";
pub const EIP712_CHAIN_ID: u64 = 1337;
pub const EIP712_VERIFYING_CONTRACT: Address = Address::ZERO;

/// EIP-712 domain constants for user-signed actions.
pub const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const USER_SIGNED_CHAIN_ID: u64 = 421614;

/// `signatureChainId` field of user-signed actions (`"0x66eee"`).
pub fn signature_chain_id() -> String {
    format!("{USER_SIGNED_CHAIN_ID:#x}")
}

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// Phantom Agent structure (EIP-712 signing target).
#[derive(Debug, Clone)]
pub struct PhantomAgent {
    /// "a" (mainnet) or "b" (testnet)
    pub source: String,
    /// action_hash result
    pub connection_id: B256,
}

impl PhantomAgent {
    pub fn new(action_hash: B256, is_mainnet: bool) -> Self {
        Self {
            source: if is_mainnet {
                "a".to_string()
            } else {
                "b".to_string()
            },
            connection_id: action_hash,
        }
    }

    /// EIP-712 signing hash under the `Exchange` domain.
    pub fn signing_hash(&self) -> B256 {
        let domain = eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: EIP712_CHAIN_ID,
            verifying_contract: EIP712_VERIFYING_CONTRACT,
        };

        let agent = Agent {
            source: self.source.clone(),
            connectionId: self.connection_id,
        };

        agent.eip712_signing_hash(&domain)
    }

    pub async fn sign<S: AlloySigner + Send + Sync>(
        &self,
        signer: &S,
    ) -> Result<PrimitiveSignature, alloy::signers::Error> {
        signer.sign_hash(&self.signing_hash()).await
    }
}

impl UserSignedData<'_> {
    /// `keccak256(typehash ‖ encoded fields)`. Strings are hashed, integers
    /// and bools are left-padded to 32 bytes.
    pub fn struct_hash(&self) -> B256 {
        let mut data = Vec::with_capacity(32 * (self.fields.len() + 1));
        data.extend_from_slice(keccak256(self.type_string().as_bytes()).as_slice());
        for (_, value) in &self.fields {
            let word: B256 = match value {
                TypedValue::String(s) => keccak256(s.as_bytes()),
                TypedValue::Uint64(n) => U256::from(*n).to_be_bytes::<32>().into(),
                TypedValue::Bool(b) => U256::from(u8::from(*b)).to_be_bytes::<32>().into(),
            };
            data.extend_from_slice(word.as_slice());
        }
        keccak256(&data)
    }

    /// `keccak256(0x1901 ‖ domain_separator ‖ struct_hash)`
    pub fn signing_hash(&self) -> B256 {
        let domain = eip712_domain! {
            name: USER_SIGNED_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: USER_SIGNED_CHAIN_ID,
            verifying_contract: EIP712_VERIFYING_CONTRACT,
        };

        let mut data = Vec::with_capacity(66);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(domain.hash_struct().as_slice());
        data.extend_from_slice(self.struct_hash().as_slice());
        keccak256(&data)
    }
}

// =============================================================================
// ActionSignature
// =============================================================================

/// Signature as it travels in the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSignature {
    /// r component (hex with 0x prefix).
    pub r: String,
    /// s component (hex with 0x prefix).
    pub s: String,
    /// Recovery id, 27 or 28.
    pub v: u8,
}

impl ActionSignature {
    /// From raw signature bytes: r(32) ‖ s(32) ‖ v(1).
    ///
    /// v of 0/1 is normalized to 27/28.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let v_raw = bytes[64];
        let v = if v_raw < 27 { v_raw + 27 } else { v_raw };
        Self {
            r: format!("0x{}", hex::encode(&bytes[0..32])),
            s: format!("0x{}", hex::encode(&bytes[32..64])),
            v,
        }
    }
}

impl From<PrimitiveSignature> for ActionSignature {
    fn from(signature: PrimitiveSignature) -> Self {
        Self::from_bytes(&signature.as_bytes())
    }
}

// =============================================================================
// Signer
// =============================================================================

/// Signing errors.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("No trading key available")]
    NoTradingKey,

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Signing failed: {0}")]
    SigningFailed(#[from] alloy::signers::Error),

    #[error("Action serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Action {0} is not user-signed")]
    NotUserSigned(&'static str),
}

/// Signs actions for one network.
///
/// Stateless apart from the key: the nonce and vault come with each call.
pub struct Signer {
    key_manager: Arc<KeyManager>,
    is_mainnet: bool,
}

impl Signer {
    /// Fails with `NoTradingKey` when the manager holds no key.
    pub fn new(key_manager: Arc<KeyManager>, is_mainnet: bool) -> Result<Self, SignerError> {
        if key_manager.trading_signer().is_none() {
            return Err(SignerError::NoTradingKey);
        }
        Ok(Self {
            key_manager,
            is_mainnet,
        })
    }

    fn signer(&self) -> Result<&PrivateKeySigner, SignerError> {
        self.key_manager
            .trading_signer()
            .ok_or(SignerError::NoTradingKey)
    }

    /// Sign `action` with the scheme it requires.
    ///
    /// `vault_address` only enters L1 hashes.
    pub async fn sign(
        &self,
        action: &Action,
        nonce: u64,
        vault_address: Option<Address>,
    ) -> Result<ActionSignature, SignerError> {
        match action.kind() {
            SigningScheme::L1 => {
                self.sign_l1(SigningInput {
                    action,
                    nonce,
                    vault_address,
                })
                .await
            }
            SigningScheme::UserSigned => self.sign_user(action).await,
        }
    }

    /// Phantom-agent signature over an L1 action.
    pub async fn sign_l1(&self, input: SigningInput<'_>) -> Result<ActionSignature, SignerError> {
        let signer = self.signer()?;
        let action_hash = input.action_hash()?;
        let phantom_agent = PhantomAgent::new(action_hash, self.is_mainnet);

        // Do not log the signature
        let signature = phantom_agent.sign(signer).await?;
        Ok(signature.into())
    }

    /// Direct EIP-712 signature over a user-signed action.
    pub async fn sign_user(&self, action: &Action) -> Result<ActionSignature, SignerError> {
        let signer = self.signer()?;
        let data = action
            .user_signed_data()
            .ok_or(SignerError::NotUserSigned(action.name()))?;
        let signature = signer.sign_hash(&data.signing_hash()).await?;
        Ok(signature.into())
    }

    pub fn address(&self) -> Option<Address> {
        self.key_manager.trading_address()
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address())
            .field("is_mainnet", &self.is_mainnet)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{BulkCancel, BulkOrder, CancelWire, OrderTypeWire, OrderWire, UsdSend};
    use hlx_core::TimeInForce;

    // Well-known test private key (DO NOT use in production)
    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_key_bytes() -> Vec<u8> {
        hex::decode(TEST_PRIVATE_KEY.trim_start_matches("0x")).unwrap()
    }

    fn test_signer(is_mainnet: bool) -> Signer {
        let manager = Arc::new(KeyManager::from_bytes(&test_key_bytes(), None).unwrap());
        Signer::new(manager, is_mainnet).unwrap()
    }

    fn golden_order() -> Action {
        Action::Order(BulkOrder::new(vec![OrderWire {
            asset: 110027,
            is_buy: true,
            limit_px: "105.00".to_string(),
            sz: "0.2".to_string(),
            reduce_only: false,
            order_type: OrderTypeWire::limit(TimeInForce::ImmediateOrCancel),
            cloid: Some("0x0de3e244a8f44fc28a6b7bc852d66d19".to_string()),
        }]))
    }

    #[test]
    fn test_key_manager_address_mismatch() {
        let result = KeyManager::from_bytes(&test_key_bytes(), Some(Address::ZERO));
        assert!(matches!(result, Err(KeyError::AddressMismatch { .. })));
    }

    #[test]
    fn test_key_manager_from_hex_source() {
        let source = KeySource::Hex(Zeroizing::new(format!("  {TEST_PRIVATE_KEY}\n")));
        let manager = KeyManager::load(Some(source), None).unwrap();
        assert!(manager.trading_address().is_some());
    }

    #[test]
    fn test_key_source_debug_redacts() {
        let source = KeySource::Hex(Zeroizing::new(TEST_PRIVATE_KEY.to_string()));
        let debug = format!("{source:?}");
        assert!(!debug.contains("ac0974"));
        assert_eq!(debug, "Hex(<redacted>)");
    }

    #[test]
    fn test_missing_env_var() {
        let source = KeySource::EnvVar {
            var_name: "HLX_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
        };
        assert!(matches!(
            KeyManager::load(Some(source), None),
            Err(KeyError::EnvVarNotFound(_))
        ));
    }

    #[test]
    fn test_signer_no_trading_key() {
        let manager = Arc::new(KeyManager::load(None, None).unwrap());
        assert!(matches!(
            Signer::new(manager, true),
            Err(SignerError::NoTradingKey)
        ));
    }

    #[test]
    fn test_golden_action_hash() {
        let action = golden_order();
        let input = SigningInput {
            action: &action,
            nonce: 1769339470576,
            vault_address: None,
        };
        assert_eq!(
            hex::encode(input.action_hash().unwrap()),
            "904c57b8f4b75ac9da005b49298dc39af735ed8c3a89b241f5f1e061e0207868"
        );
    }

    #[test]
    fn test_action_hash_with_vault() {
        let action = Action::Cancel(BulkCancel {
            cancels: vec![CancelWire { asset: 5, oid: 123 }],
        });
        let with_vault = SigningInput {
            action: &action,
            nonce: 1000,
            vault_address: Some(Address::repeat_byte(0x42)),
        };
        let without = SigningInput {
            vault_address: None,
            ..with_vault.clone()
        };
        assert_ne!(
            with_vault.action_hash().unwrap(),
            without.action_hash().unwrap()
        );
    }

    #[test]
    fn test_phantom_agent_source() {
        let hash = B256::repeat_byte(0xab);
        assert_eq!(PhantomAgent::new(hash, true).source, "a");
        assert_eq!(PhantomAgent::new(hash, false).source, "b");
    }

    /// Domain separator and struct hash built by hand must match alloy.
    #[test]
    fn test_eip712_domain_separator() {
        let domain = eip712_domain! {
            name: EIP712_DOMAIN_NAME,
            version: EIP712_DOMAIN_VERSION,
            chain_id: EIP712_CHAIN_ID,
            verifying_contract: EIP712_VERIFYING_CONTRACT,
        };

        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let mut domain_data = Vec::new();
        domain_data.extend_from_slice(type_hash.as_slice());
        domain_data.extend_from_slice(keccak256(EIP712_DOMAIN_NAME.as_bytes()).as_slice());
        domain_data.extend_from_slice(keccak256(EIP712_DOMAIN_VERSION.as_bytes()).as_slice());
        let mut chain_id_bytes = [0u8; 32];
        chain_id_bytes[24..].copy_from_slice(&EIP712_CHAIN_ID.to_be_bytes());
        domain_data.extend_from_slice(&chain_id_bytes);
        domain_data.extend_from_slice(&[0u8; 32]);
        assert_eq!(domain.hash_struct(), keccak256(&domain_data));

        let action_hash = B256::repeat_byte(0x11);
        let agent = Agent {
            source: "b".to_string(),
            connectionId: action_hash,
        };
        let mut struct_data = Vec::new();
        struct_data.extend_from_slice(
            keccak256(b"Agent(string source,bytes32 connectionId)").as_slice(),
        );
        struct_data.extend_from_slice(keccak256(b"b").as_slice());
        struct_data.extend_from_slice(action_hash.as_slice());
        assert_eq!(agent.eip712_hash_struct(), keccak256(&struct_data));
    }

    /// RFC 6979 signatures are deterministic; these are the reference values.
    #[tokio::test]
    async fn test_signature_matches_reference() {
        let signer = PrivateKeySigner::from_slice(&test_key_bytes()).unwrap();
        let action_hash = B256::from_slice(
            &hex::decode("f01fa6eaca0b8cbd2afe65f8852a2e00d35eae3d19560ece9b8a28614646e849")
                .unwrap(),
        );

        let signature = PhantomAgent::new(action_hash, false)
            .sign(&signer)
            .await
            .unwrap();

        assert_eq!(
            hex::encode(signature.r().to_be_bytes::<32>()),
            "a9e728f2faea4febc0b6eb9c3dbbac04b375eb3869f051030d205318425faebc"
        );
        assert_eq!(
            hex::encode(signature.s().to_be_bytes::<32>()),
            "7b21be7030bb979352b71494708b99d789266f0d0e1242a21e74905b683e4698"
        );
        assert!(!signature.v());

        let wire = ActionSignature::from(signature);
        assert_eq!(
            wire.r,
            "0xa9e728f2faea4febc0b6eb9c3dbbac04b375eb3869f051030d205318425faebc"
        );
        assert_eq!(wire.v, 27);
    }

    #[test]
    fn test_signature_from_bytes_normalizes_v() {
        let mut bytes = [0u8; 65];
        bytes[0] = 0xab;
        bytes[64] = 1;
        let sig = ActionSignature::from_bytes(&bytes);
        assert_eq!(sig.v, 28);
        assert!(sig.r.starts_with("0xab"));
        assert_eq!(sig.s.len(), 66);

        bytes[64] = 27;
        assert_eq!(ActionSignature::from_bytes(&bytes).v, 27);
    }

    #[test]
    fn test_user_signed_struct_hash_encoding() {
        let action = Action::UsdSend(UsdSend {
            signature_chain_id: signature_chain_id(),
            hyperliquid_chain: "Testnet".to_string(),
            destination: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "1".to_string(),
            time: 1700000000000,
        });
        let data = action.user_signed_data().unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(
            keccak256(
                b"HyperliquidTransaction:UsdSend(string hyperliquidChain,string destination,string amount,uint64 time)",
            )
            .as_slice(),
        );
        expected.extend_from_slice(keccak256(b"Testnet").as_slice());
        expected.extend_from_slice(
            keccak256(b"0x0000000000000000000000000000000000000001").as_slice(),
        );
        expected.extend_from_slice(keccak256(b"1").as_slice());
        let mut time = [0u8; 32];
        time[24..].copy_from_slice(&1700000000000u64.to_be_bytes());
        expected.extend_from_slice(&time);

        assert_eq!(data.struct_hash(), keccak256(&expected));
        assert_eq!(signature_chain_id(), "0x66eee");
    }

    #[tokio::test]
    async fn test_sign_dispatches_by_scheme() {
        let signer = test_signer(false);
        let address = signer.address().unwrap();

        let order = golden_order();
        let sig = signer.sign(&order, 1, None).await.unwrap();
        let agent = PhantomAgent::new(
            SigningInput {
                action: &order,
                nonce: 1,
                vault_address: None,
            }
            .action_hash()
            .unwrap(),
            false,
        );
        assert_eq!(recover(&sig, agent.signing_hash()), address);

        let send = Action::UsdSend(UsdSend {
            signature_chain_id: signature_chain_id(),
            hyperliquid_chain: "Testnet".to_string(),
            destination: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "1".to_string(),
            time: 5,
        });
        let sig = signer.sign(&send, 5, None).await.unwrap();
        let hash = send.user_signed_data().unwrap().signing_hash();
        assert_eq!(recover(&sig, hash), address);

        assert!(matches!(
            signer.sign_user(&order).await,
            Err(SignerError::NotUserSigned("order"))
        ));
    }

    fn recover(sig: &ActionSignature, hash: B256) -> Address {
        let r = U256::from_str_radix(sig.r.trim_start_matches("0x"), 16).unwrap();
        let s = U256::from_str_radix(sig.s.trim_start_matches("0x"), 16).unwrap();
        PrimitiveSignature::new(r, s, sig.v == 28)
            .recover_address_from_prehash(&hash)
            .unwrap()
    }
}
