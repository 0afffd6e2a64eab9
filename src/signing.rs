use crate::encoding::pack_user_op;
use crate::types::UserOperation;
use anyhow::{Context, Result};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, Signature, H256};
use ethers::utils::keccak256;

/// EIP-191 "personal message" prefix for a 32-byte message.
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Keccak-256 of the packed UserOperation.
pub fn user_op_hash(op: &UserOperation) -> H256 {
    H256(keccak256(pack_user_op(op)))
}

/// Keccak-256 of `PERSONAL_MESSAGE_PREFIX || hash`. This is what actually gets signed,
/// same as `signMessage(hash)` in a wallet.
pub fn personal_digest(hash: H256) -> H256 {
    let mut msg = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    msg.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    msg.extend_from_slice(hash.as_bytes());
    H256(keccak256(msg))
}

/// Signs `op` with `wallet` and returns a copy carrying the signer address and the
/// 65-byte `r || s || v` signature (`v` is 27 or 28).
///
/// Signing is synchronous and deterministic (RFC 6979 nonces): the same key and operation
/// always produce the same signature.
pub fn sign_user_op(op: &UserOperation, wallet: &LocalWallet) -> Result<UserOperation> {
    let digest = personal_digest(user_op_hash(op));
    let sig = wallet
        .sign_hash(digest)
        .context("failed to sign userOp hash")?;

    tracing::debug!(
        signer = ?wallet.address(),
        digest = ?digest,
        "signed user operation"
    );

    Ok(UserOperation {
        signer: wallet.address(),
        signature: Bytes::from(sig.to_vec()),
        ..op.clone()
    })
}

/// Recovers the address that produced `op.signature` over the personal digest of `op`.
pub fn recover_signer(op: &UserOperation) -> Result<Address> {
    let sig = Signature::try_from(op.signature.as_ref())
        .context("signature is not a 65-byte r || s || v signature")?;
    let digest = personal_digest(user_op_hash(op));
    let recovered = sig
        .recover(digest)
        .context("failed to recover signer from signature")?;
    Ok(recovered)
}

/// True when the signature recovers to `op.signer`.
pub fn verify_user_op(op: &UserOperation) -> Result<bool> {
    Ok(recover_signer(op)? == op.signer)
}

#[cfg(test)]
mod tests {
    use super::{personal_digest, recover_signer, sign_user_op, user_op_hash, verify_user_op};
    use crate::types::UserOperation;
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::{Address, Bytes, H256, U256};
    use ethers::utils::hash_message;
    use std::str::FromStr;

    // Well-known dev key (anvil / hardhat account #0).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn dev_wallet() -> LocalWallet {
        LocalWallet::from_str(DEV_KEY).unwrap()
    }

    fn sample_op() -> UserOperation {
        UserOperation {
            target: Address::repeat_byte(0xaa),
            call_data: Bytes::from(vec![0x12, 0x34]),
            call_gas: 100_000,
            max_fee_per_gas: U256::from(1_000_000_000u64),
            ..Default::default()
        }
    }

    #[test]
    fn personal_digest_matches_eip191_hash_message() {
        let hash = user_op_hash(&sample_op());
        assert_eq!(personal_digest(hash), hash_message(hash.as_bytes()));
    }

    #[test]
    fn sign_sets_signer_and_rsv_signature() {
        let wallet = dev_wallet();
        let op = sample_op();
        let signed = sign_user_op(&op, &wallet).unwrap();

        assert_eq!(signed.signer, Address::from_str(DEV_ADDRESS).unwrap());
        assert_eq!(signed.signature.len(), 65);
        let v = signed.signature[64];
        assert!(v == 27 || v == 28, "unexpected v {v}");

        // everything else is untouched
        assert_eq!(
            UserOperation {
                signer: op.signer,
                signature: op.signature.clone(),
                ..signed.clone()
            },
            op
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let wallet = dev_wallet();
        let op = sample_op();
        let a = sign_user_op(&op, &wallet).unwrap();
        let b = sign_user_op(&op, &wallet).unwrap();
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn signature_recovers_signer() {
        let wallet = dev_wallet();
        let signed = sign_user_op(&sample_op(), &wallet).unwrap();
        assert_eq!(recover_signer(&signed).unwrap(), wallet.address());
        assert!(verify_user_op(&signed).unwrap());
    }

    #[tokio::test]
    async fn signature_matches_wallet_sign_message() {
        let wallet = dev_wallet();
        let op = sample_op();
        let hash: H256 = user_op_hash(&op);
        let expected = wallet.sign_message(hash.as_bytes()).await.unwrap();
        let signed = sign_user_op(&op, &wallet).unwrap();
        assert_eq!(signed.signature.to_vec(), expected.to_vec());
    }

    #[test]
    fn signature_survives_init_code_changes_only() {
        let wallet = dev_wallet();
        let signed = sign_user_op(&sample_op(), &wallet).unwrap();

        let redeployed = UserOperation {
            init_code: Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]),
            ..signed.clone()
        };
        assert!(verify_user_op(&redeployed).unwrap());

        let tampered = UserOperation {
            call_gas: signed.call_gas + 1,
            ..signed
        };
        assert!(!verify_user_op(&tampered).unwrap());
    }

    #[test]
    fn recover_rejects_malformed_signature() {
        let op = UserOperation {
            signature: Bytes::from(vec![1, 2, 3]),
            ..sample_op()
        };
        assert!(recover_signer(&op).is_err());
    }
}
