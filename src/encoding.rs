use crate::types::UserOperation;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};

/// ABI-encodes the signed subset of a UserOperation:
///
/// `(address target, uint256 nonce, bytes callData, uint64 callGas, uint maxFeePerGas,
/// uint maxPriorityFeePerGas, address paymaster)`
///
/// `init_code`, `signer` and `signature` are not part of the payload, so operations that only
/// differ in those fields pack to the same bytes. Verifiers rely on this exact layout.
pub fn pack_user_op(op: &UserOperation) -> Bytes {
    let encoded = encode(&[
        Token::Address(op.target),
        Token::Uint(op.nonce),
        Token::Bytes(op.call_data.to_vec()),
        Token::Uint(U256::from(op.call_gas)),
        Token::Uint(op.max_fee_per_gas),
        Token::Uint(op.max_priority_fee_per_gas),
        Token::Address(op.paymaster),
    ]);

    Bytes::from(encoded)
}

pub fn fmt_address(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_bytes()))
}

pub fn fmt_h256(h: H256) -> String {
    format!("0x{}", hex::encode(h.as_bytes()))
}

pub fn fmt_bytes(b: &Bytes) -> String {
    format!("0x{}", hex::encode(b.as_ref()))
}
