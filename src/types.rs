use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Priority fee carried by the zero operation.
pub const DEFAULT_MAX_PRIORITY_FEE_PER_GAS: u64 = 3;

/// Account-abstraction UserOperation as consumed by the test contracts.
///
/// Only `target`, `nonce`, `call_data`, `call_gas`, both fee fields and `paymaster` are
/// covered by the signature. `init_code` is not: its effect is captured through the derived
/// target address and the forced zero nonce.
///
/// `signer` and `signature` are meaningless until the operation has been signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub target: Address,
    pub nonce: U256,
    /// Account constructor, only set when the account is not deployed yet.
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas: u64,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster: Address,
    pub signer: Address,
    pub signature: Bytes,
}

impl Default for UserOperation {
    /// The zero operation: every field empty or zero, except a priority fee of 3.
    fn default() -> Self {
        Self {
            target: Address::zero(),
            nonce: U256::zero(),
            init_code: Bytes::new(),
            call_data: Bytes::new(),
            call_gas: 0,
            max_fee_per_gas: U256::zero(),
            max_priority_fee_per_gas: U256::from(DEFAULT_MAX_PRIORITY_FEE_PER_GAS),
            paymaster: Address::zero(),
            signer: Address::zero(),
            signature: Bytes::new(),
        }
    }
}

/// A UserOperation where any field may still be unset.
///
/// Unset fields are resolved by [`crate::fill::fill_and_sign`] (from the chain) or
/// [`crate::fill::fill_user_op`] (from a defaults operation).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialUserOperation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_code: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
}

impl PartialUserOperation {
    pub fn target(mut self, target: Address) -> Self {
        self.target = Some(target);
        self
    }

    /// Ignored by `fill_and_sign` when `init_code` is set; deployment always uses nonce 0.
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = Some(init_code);
        self
    }

    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = Some(call_data);
        self
    }

    pub fn call_gas(mut self, call_gas: u64) -> Self {
        self.call_gas = Some(call_gas);
        self
    }

    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self
    }

    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    pub fn paymaster(mut self, paymaster: Address) -> Self {
        self.paymaster = Some(paymaster);
        self
    }

    /// Only survives [`fill_user_op`](crate::fill_user_op). Signing overwrites it with the
    /// wallet address.
    pub fn signer(mut self, signer: Address) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Only survives [`fill_user_op`](crate::fill_user_op). Signing replaces it.
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = Some(signature);
        self
    }
}

impl From<UserOperation> for PartialUserOperation {
    fn from(op: UserOperation) -> Self {
        Self {
            target: Some(op.target),
            nonce: Some(op.nonce),
            init_code: Some(op.init_code),
            call_data: Some(op.call_data),
            call_gas: Some(op.call_gas),
            max_fee_per_gas: Some(op.max_fee_per_gas),
            max_priority_fee_per_gas: Some(op.max_priority_fee_per_gas),
            paymaster: Some(op.paymaster),
            signer: Some(op.signer),
            signature: Some(op.signature),
        }
    }
}
