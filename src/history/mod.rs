//! Per-transaction classification from a wallet's point of view, and the
//! flat, ordered history built from it.

pub mod parser;
pub mod sort;
mod token_entries;
pub mod types;

pub use parser::classify;
pub use sort::{flatten, sort_and_trim, EntryOutcome, HistoryEntry, SortKey};
pub use types::{
    ActionData, AppAction, Direction, ParsedTokenEntry, ParsedTx, ProtocolLabel, RenderedTxType,
    XecTxType,
};
