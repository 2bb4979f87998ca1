use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chronik::{Tx, TxHistoryPage};

use super::types::ParsedTx;

/// Position of a history item: block height once mined, first-seen time
/// while in the mempool.
pub trait SortKey {
    fn block_height(&self) -> Option<u64>;
    fn time_first_seen(&self) -> i64;
}

impl SortKey for Tx {
    fn block_height(&self) -> Option<u64> {
        self.block.as_ref().map(|block| block.height)
    }

    fn time_first_seen(&self) -> i64 {
        self.time_first_seen
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EntryOutcome {
    Parsed(ParsedTx),
    /// The tx could not be walked; kept so the history still shows it.
    Unparseable { error: String },
}

/// One row of the flat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub txid: String,
    pub block_height: Option<u64>,
    pub time_first_seen: i64,
    pub block_time: Option<DateTime<Utc>>,
    pub outcome: EntryOutcome,
}

impl HistoryEntry {
    pub fn new(tx: &Tx, outcome: EntryOutcome) -> Self {
        Self {
            txid: tx.txid.clone(),
            block_height: tx.block_height(),
            time_first_seen: tx.time_first_seen,
            block_time: tx
                .block
                .as_ref()
                .and_then(|block| DateTime::from_timestamp(block.timestamp, 0)),
            outcome,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_height.is_some()
    }

    pub fn parsed(&self) -> Option<&ParsedTx> {
        match &self.outcome {
            EntryOutcome::Parsed(parsed) => Some(parsed),
            EntryOutcome::Unparseable { .. } => None,
        }
    }
}

impl SortKey for HistoryEntry {
    fn block_height(&self) -> Option<u64> {
        self.block_height
    }

    fn time_first_seen(&self) -> i64 {
        self.time_first_seen
    }
}

/// Concatenate per-address history pages. A tx touching several wallet
/// addresses shows up in each of their pages; only the first copy is kept.
pub fn flatten(pages: Vec<TxHistoryPage>) -> Vec<Tx> {
    let mut seen = HashSet::new();
    let mut txs = Vec::new();
    for tx in pages.into_iter().flat_map(|page| page.txs) {
        if seen.insert(tx.txid.clone()) {
            txs.push(tx);
        } else {
            tracing::debug!(txid = %tx.txid, "Dropping duplicate history tx");
        }
    }
    txs
}

fn compare<T: SortKey>(a: &T, b: &T, unconfirmed_first: bool) -> Ordering {
    match (a.block_height(), b.block_height()) {
        (Some(a_height), Some(b_height)) => b_height.cmp(&a_height),
        (None, None) => b.time_first_seen().cmp(&a.time_first_seen()),
        (Some(_), None) if unconfirmed_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) if unconfirmed_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
    }
}

/// Order newest first and keep `limit` items.
///
/// Confirmed items come before unconfirmed ones (after them with
/// `unconfirmed_first`). Confirmed items sort by descending height,
/// unconfirmed ones by descending first-seen time. The sort is stable, so
/// equal keys keep their input order and a second pass changes nothing.
pub fn sort_and_trim<T: SortKey>(
    mut items: Vec<T>,
    limit: usize,
    unconfirmed_first: bool,
) -> Vec<T> {
    items.sort_by(|a, b| compare(a, b, unconfirmed_first));
    items.truncate(limit);
    items
}
