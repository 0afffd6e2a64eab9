//! Test fixtures for account-abstraction UserOperations: pack the signed fields, sign them
//! with the personal-message prefix, and fill unset fields from defaults or from a node.

pub mod contracts;
pub mod encoding;
pub mod fill;
pub mod signing;
pub mod types;

pub use encoding::pack_user_op;
pub use fill::{fill_and_sign, fill_user_op, CALL_GAS_OVERHEAD};
pub use signing::{recover_signer, sign_user_op, user_op_hash, verify_user_op};
pub use types::{PartialUserOperation, UserOperation};
