//! Data model of the chronik indexer. Everything here is supplied by the
//! indexer client; this crate only reads it.

pub mod serde_util;
pub mod types;

pub use types::{
    BlockMetadata, OutPoint, SlpBurn, SlpMeta, SlpToken, SlpTxData, TokenEntry, TokenGenesisInfo,
    TokenResponse, TokenStats, TokenType, Tx, TxHistoryPage, TxInput, TxOutput, Utxo,
};
