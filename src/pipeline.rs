use serde::{Deserialize, Serialize};

use crate::chronik::{Tx, TxHistoryPage};
use crate::config::Config;
use crate::decoder::TokenTxType;
use crate::history::{classify, flatten, sort_and_trim, EntryOutcome, HistoryEntry};
use crate::tokens::{resolve_missing, TokenCache, TokenSource};
use crate::wallet::WalletHashes;

/// Counters for one pipeline run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub txs_seen: usize,
    pub entries: usize,
    pub parsed: usize,
    /// Parsed txs that carry at least one token entry.
    pub token_txs: usize,
    pub unparseable: usize,
    pub tokens_resolved: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    pub entries: Vec<HistoryEntry>,
    pub summary: HistorySummary,
}

/// Builds a wallet's flat history:
/// 1. Flatten the per-address pages
/// 2. Sort and trim to the configured count
/// 3. Fetch genesis info for tokens the cache has not seen
/// 4. Classify each tx, isolating failures to that tx
pub struct HistoryPipeline<S> {
    pub wallet: WalletHashes,
    pub token_cache: TokenCache,
    source: S,
    count: usize,
    unconfirmed_first: bool,
    cash_decimals: u8,
}

impl<S: TokenSource> HistoryPipeline<S> {
    pub fn init(config: &Config, source: S) -> eyre::Result<Self> {
        let wallet = WalletHashes::from_config(&config.wallet.hashes, &config.wallet.addresses)
            .map_err(|e| eyre::eyre!("Failed to build wallet: {}", e))?;
        let token_cache = TokenCache::from_config(&config.tokens);

        Ok(Self {
            wallet,
            token_cache,
            source,
            count: config.history.count,
            unconfirmed_first: config.history.unconfirmed_first,
            cash_decimals: config.app.cash_decimals,
        })
    }

    /// Point the pipeline at another wallet. Cached token info is dropped
    /// along with the old wallet.
    pub fn switch_wallet(&mut self, wallet: WalletHashes) {
        self.token_cache.clear();
        self.wallet = wallet;
    }

    pub async fn run(&self, pages: Vec<TxHistoryPage>) -> HistoryReport {
        let txs = flatten(pages);
        let txs_seen = txs.len();
        let txs = sort_and_trim(txs, self.count, self.unconfirmed_first);

        let token_ids: Vec<String> = txs.iter().flat_map(referenced_token_ids).collect();
        let tokens_resolved = resolve_missing(&self.token_cache, &self.source, &token_ids).await;
        let token_info = self.token_cache.snapshot();

        let mut summary = HistorySummary {
            txs_seen,
            tokens_resolved,
            ..Default::default()
        };
        let entries: Vec<HistoryEntry> = txs
            .iter()
            .map(|tx| {
                let outcome = match classify(tx, &self.wallet, &token_info, self.cash_decimals) {
                    Ok(parsed) => {
                        tracing::debug!(
                            txid = %tx.txid,
                            direction = parsed.direction.as_str(),
                            xec_tx_type = parsed.xec_tx_type.as_str(),
                            token_entries = parsed.token_entries.len(),
                            "Classified tx"
                        );
                        summary.parsed += 1;
                        if parsed.is_token_tx() {
                            summary.token_txs += 1;
                        }
                        EntryOutcome::Parsed(parsed)
                    }
                    Err(e) => {
                        tracing::warn!(txid = %tx.txid, error = %e, "Skipping unparseable tx");
                        summary.unparseable += 1;
                        EntryOutcome::Unparseable {
                            error: e.to_string(),
                        }
                    }
                };
                HistoryEntry::new(tx, outcome)
            })
            .collect();
        summary.entries = entries.len();

        tracing::info!(
            txs_seen = summary.txs_seen,
            entries = summary.entries,
            parsed = summary.parsed,
            token_txs = summary.token_txs,
            unparseable = summary.unparseable,
            tokens_resolved = summary.tokens_resolved,
            "History built"
        );

        HistoryReport { entries, summary }
    }
}

/// A history dump is either one indexer page or a bare array of txs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryDump {
    Page(TxHistoryPage),
    Txs(Vec<Tx>),
}

pub fn parse_history_dump(content: &str) -> serde_json::Result<TxHistoryPage> {
    Ok(match serde_json::from_str(content)? {
        HistoryDump::Page(page) => page,
        HistoryDump::Txs(txs) => TxHistoryPage { txs, num_pages: 1 },
    })
}

/// Read every history dump, one page per file.
pub fn load_history(paths: &[String]) -> eyre::Result<Vec<TxHistoryPage>> {
    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read history dump '{}': {}", path, e))?;
        let page = parse_history_dump(&content)
            .map_err(|e| eyre::eyre!("Failed to parse history dump '{}': {}", path, e))?;
        tracing::info!(path = %path, txs = page.txs.len(), "Loaded history dump");
        pages.push(page);
    }
    Ok(pages)
}

/// Raw utxo objects. Kept untyped so fields the data model does not know
/// survive into the output.
pub fn load_utxos(path: &str) -> eyre::Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("Failed to read utxo dump '{}': {}", path, e))?;
    let utxos: Vec<serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| eyre::eyre!("Failed to parse utxo dump '{}': {}", path, e))?;
    tracing::info!(path, utxos = utxos.len(), "Loaded utxo dump");
    Ok(utxos)
}

/// Token ids the indexer annotated on `tx`, which are the ones classifying
/// it needs genesis info for. A GENESIS carries its own, so it is not listed.
fn referenced_token_ids(tx: &Tx) -> Vec<String> {
    let genesis = TokenTxType::Genesis.as_str();
    let mut ids: Vec<String> = tx
        .inputs
        .iter()
        .filter_map(|input| input.slp_burn.as_ref())
        .map(|burn| burn.token_id.clone())
        .collect();
    ids.extend(
        tx.token_entries
            .iter()
            .filter(|entry| entry.tx_type != genesis)
            .map(|entry| entry.token_id.clone()),
    );
    if let Some(data) = tx.slp_tx_data.as_ref() {
        if data.slp_meta.tx_type != genesis {
            ids.push(data.slp_meta.token_id.clone());
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::chronik::{SlpToken, TokenResponse};
    use crate::config::{AppConfig, HistoryConfig, InputConfig, WalletConfig};
    use crate::history::{ProtocolLabel, XecTxType};
    use crate::tokens::JsonTokenSource;

    const WALLET: &str = "95e79f51d4260bc0dc3ba7fb77c7be92d0fbdd1d";
    const OTHER: &str = "a5417349420ec53b27522fed1a63b1672c0f28ff";
    const SEND_TOKEN_ID: &str = "0daf200e3418f2df1158efef36fbb507f12928f1fdcf3543703e64e75a4a9073";

    fn config(count: usize) -> Config {
        Config {
            wallet: WalletConfig {
                hashes: vec![WALLET.to_string()],
                addresses: vec![],
            },
            history: HistoryConfig {
                count,
                unconfirmed_first: false,
            },
            app: AppConfig { cash_decimals: 2 },
            input: InputConfig {
                history: vec!["history.json".to_string()],
                utxos: None,
                tokens: None,
            },
            tokens: vec![],
        }
    }

    fn source() -> JsonTokenSource {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "tokenId": SEND_TOKEN_ID,
            "genesisInfo": {"tokenTicker": "TBS", "tokenName": "TestBits", "decimals": 2}
        }))
        .unwrap();
        JsonTokenSource::new(HashMap::from([(SEND_TOKEN_ID.to_string(), response)]))
    }

    fn p2pkh(hash: &str) -> String {
        format!("76a914{}88ac", hash)
    }

    fn tx(txid: &str, height: Option<u64>, seen: i64, op_return: Option<&str>) -> Tx {
        let mut outputs = vec![];
        if let Some(script) = op_return {
            outputs.push(serde_json::json!({"value": 0, "outputScript": script}));
        }
        outputs.push(serde_json::json!({"value": 546, "outputScript": p2pkh(WALLET)}));
        outputs.push(serde_json::json!({"value": 9000, "outputScript": p2pkh(OTHER)}));
        serde_json::from_value(serde_json::json!({
            "txid": txid,
            "inputs": [{
                "prevOut": {"txid": "11".repeat(32), "outIdx": 0},
                "outputScript": p2pkh(OTHER),
                "value": 10000
            }],
            "outputs": outputs,
            "timeFirstSeen": seen,
            "block": height.map(|h| serde_json::json!({
                "height": h,
                "hash": "00".repeat(32),
                "timestamp": 1_700_000_000
            })),
        }))
        .unwrap()
    }

    fn pages() -> Vec<TxHistoryPage> {
        let send = "6a04534c500001010453454e44200daf200e3418f2df1158efef36fbb507f12928f1fdcf3543703e64e75a4a90730800000000004c4b40";
        let mut token_tx = tx(&"cc".repeat(32), Some(200), 0, Some(send));
        token_tx.outputs[1].slp_token = Some(SlpToken {
            token_id: Some(SEND_TOKEN_ID.to_string()),
            amount: "5000000".to_string(),
            is_mint_baton: false,
        });
        token_tx.token_entries = vec![serde_json::from_value(
            serde_json::json!({"tokenId": SEND_TOKEN_ID, "txType": "SEND"}),
        )
        .unwrap()];
        vec![
            TxHistoryPage {
                txs: vec![
                    tx(&"aa".repeat(32), Some(100), 0, None),
                    tx(&"bb".repeat(32), None, 50, Some("6a04534c50")),
                ],
                num_pages: 1,
            },
            TxHistoryPage {
                txs: vec![token_tx],
                num_pages: 1,
            },
        ]
    }

    #[tokio::test]
    async fn test_run_isolates_failures_and_resolves_tokens() {
        let pipeline = HistoryPipeline::init(&config(10), source()).unwrap();
        let report = pipeline.run(pages()).await;

        assert_eq!(
            report.summary,
            HistorySummary {
                txs_seen: 3,
                entries: 3,
                parsed: 2,
                token_txs: 1,
                unparseable: 1,
                tokens_resolved: 1,
            }
        );
        let txids: Vec<&str> = report.entries.iter().map(|e| e.txid.as_str()).collect();
        assert_eq!(txids, vec!["cc".repeat(32), "aa".repeat(32), "bb".repeat(32)]);

        let token_tx = report.entries[0].parsed().unwrap();
        assert_eq!(token_tx.xec_tx_type, XecTxType::Received);
        assert!(matches!(token_tx.protocol, ProtocolLabel::Token { .. }));
        assert_eq!(token_tx.token_entries[0].amount.as_deref(), Some("50000.00"));

        assert!(matches!(
            report.entries[2].outcome,
            EntryOutcome::Unparseable { .. }
        ));
    }

    #[tokio::test]
    async fn test_run_trims_before_resolving() {
        let pipeline = HistoryPipeline::init(&config(1), source()).unwrap();
        let report = pipeline.run(pages()).await;
        assert_eq!(report.summary.entries, 1);
        assert_eq!(report.summary.tokens_resolved, 1);

        // already cached on the second run
        let again = pipeline.run(pages()).await;
        assert_eq!(again.summary.tokens_resolved, 0);
        assert_eq!(again.entries, report.entries);
    }

    #[test]
    fn test_parse_history_dump_accepts_page_or_array() {
        let page_json = r#"{"txs": [{"txid": "aa", "inputs": [], "outputs": []}], "numPages": 3}"#;
        let page = parse_history_dump(page_json).unwrap();
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.txs[0].txid, "aa");

        let bare = parse_history_dump(r#"[{"txid": "bb", "inputs": [], "outputs": []}]"#).unwrap();
        assert_eq!(bare.num_pages, 1);
        assert_eq!(bare.txs[0].txid, "bb");

        assert!(parse_history_dump(r#"{"nope": 1}"#).is_err());
    }

    #[test]
    fn test_referenced_token_ids_skip_genesis() {
        let mut send = tx(&"dd".repeat(32), None, 0, None);
        send.token_entries = serde_json::from_value(serde_json::json!([
            {"tokenId": SEND_TOKEN_ID, "txType": "SEND"},
            {"tokenId": "ee".repeat(32), "txType": "GENESIS"}
        ]))
        .unwrap();
        assert_eq!(referenced_token_ids(&send), vec![SEND_TOKEN_ID.to_string()]);

        // no annotations, nothing to fetch
        let bare = tx(&"de".repeat(32), None, 0, Some("6a04534c50000101"));
        assert!(referenced_token_ids(&bare).is_empty());
    }

    #[tokio::test]
    async fn test_switch_wallet_clears_token_cache() {
        let mut pipeline = HistoryPipeline::init(&config(10), source()).unwrap();
        pipeline.run(pages()).await;
        assert!(pipeline.token_cache.contains(SEND_TOKEN_ID));

        pipeline.switch_wallet(WalletHashes::new([OTHER]));
        assert!(pipeline.token_cache.is_empty());
        let report = pipeline.run(pages()).await;
        assert_eq!(report.summary.tokens_resolved, 1);
        // the other wallet is now the sender
        let token_tx = report.entries[0].parsed().unwrap();
        assert_eq!(token_tx.xec_tx_type, XecTxType::Sent);
        assert_eq!(token_tx.token_entries[0].token_satoshis, "5000000");
    }
}
