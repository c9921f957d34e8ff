//! Owned, flat records built from engine output.

mod data_type;
mod key;
mod result;
mod validity;

pub use data_type::DataType;
pub use key::{Key, KeySignature, UidSignatures, UserId};
pub use result::{
    hash_algo_name, pubkey_algo_name, symmetric_algo_name, DecryptResult, MessageSignature,
    RecipientInfo, SigSummary, Status, VerifyResult,
};
pub use validity::{KeyListMode, Protocol, Validity};
