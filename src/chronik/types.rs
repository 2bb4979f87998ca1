use serde::{Deserialize, Serialize};

use super::serde_util::{amount_string_from_any, i64_from_any, u64_from_any};

/// A transaction as served by the chronik indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tx {
    pub txid: String,
    #[serde(default)]
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    #[serde(default)]
    pub lock_time: u32,
    #[serde(default, alias = "tokenData")]
    pub slp_tx_data: Option<SlpTxData>,
    /// Newer indexers describe each token touched by the tx here instead of
    /// in `slp_tx_data`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_entries: Vec<TokenEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_status: Option<String>,
    /// Absent while the tx is in the mempool.
    #[serde(default)]
    pub block: Option<BlockMetadata>,
    #[serde(default, deserialize_with = "i64_from_any")]
    pub time_first_seen: i64,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(default)]
    pub network: Option<String>,
}

impl Tx {
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub txid: String,
    pub out_idx: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    pub prev_out: OutPoint,
    #[serde(default)]
    pub input_script: String,
    /// Locking script of the spent output. Coinbase inputs have none.
    #[serde(default)]
    pub output_script: Option<String>,
    #[serde(default, deserialize_with = "u64_from_any")]
    pub value: u64,
    #[serde(default)]
    pub sequence_no: u32,
    #[serde(default)]
    pub slp_burn: Option<SlpBurn>,
    #[serde(default, alias = "token")]
    pub slp_token: Option<SlpToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    #[serde(deserialize_with = "u64_from_any")]
    pub value: u64,
    pub output_script: String,
    #[serde(default, alias = "token")]
    pub slp_token: Option<SlpToken>,
    #[serde(default)]
    pub spent_by: Option<OutPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpToken {
    /// Only present in the newer `token` shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(deserialize_with = "amount_string_from_any")]
    pub amount: String,
    #[serde(default)]
    pub is_mint_baton: bool,
}

/// Tokens destroyed by an input, as annotated by the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpBurn {
    pub token: SlpToken,
    pub token_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpTxData {
    pub slp_meta: SlpMeta,
    #[serde(default)]
    pub genesis_info: Option<TokenGenesisInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlpMeta {
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub tx_type: String,
    pub token_id: String,
    #[serde(default)]
    pub group_token_id: Option<String>,
}

/// Protocol and kind of a token, e.g. `SLP` / `SLP_TOKEN_TYPE_NFT1_GROUP` / 129.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenType {
    pub protocol: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub number: u32,
}

/// The indexer's verdict on one token a tx touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub token_id: String,
    #[serde(default)]
    pub token_type: Option<TokenType>,
    #[serde(default)]
    pub tx_type: String,
    #[serde(default)]
    pub is_invalid: bool,
    #[serde(default)]
    pub burn_summary: String,
    #[serde(default = "zero_amount", deserialize_with = "amount_string_from_any")]
    pub actual_burn_amount: String,
    #[serde(default = "zero_amount", deserialize_with = "amount_string_from_any")]
    pub intentional_burn: String,
    #[serde(default)]
    pub burns_mint_batons: bool,
}

impl TokenEntry {
    /// Tokens were destroyed, on purpose or not.
    pub fn is_burn(&self) -> bool {
        (!self.burn_summary.is_empty() && self.actual_burn_amount != "0")
            || self.intentional_burn != "0"
    }
}

fn zero_amount() -> String {
    "0".to_string()
}

/// Immutable token metadata fixed at GENESIS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGenesisInfo {
    #[serde(alias = "ticker")]
    pub token_ticker: String,
    #[serde(alias = "name")]
    pub token_name: String,
    #[serde(default, alias = "url")]
    pub token_document_url: String,
    #[serde(default, alias = "hash")]
    pub token_document_hash: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    #[serde(deserialize_with = "u64_from_any")]
    pub height: u64,
    #[serde(default)]
    pub hash: String,
    #[serde(default, deserialize_with = "i64_from_any")]
    pub timestamp: i64,
}

/// Raw mint/burn totals, in undecimalized token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    #[serde(deserialize_with = "amount_string_from_any")]
    pub total_minted: String,
    #[serde(deserialize_with = "amount_string_from_any")]
    pub total_burned: String,
}

/// Response of the indexer's token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub slp_tx_data: Option<SlpTxData>,
    #[serde(default)]
    pub genesis_info: Option<TokenGenesisInfo>,
    #[serde(default)]
    pub token_stats: Option<TokenStats>,
    #[serde(default)]
    pub block: Option<BlockMetadata>,
    #[serde(default, deserialize_with = "i64_from_any")]
    pub time_first_seen: i64,
    #[serde(default)]
    pub initial_token_quantity: Option<String>,
    #[serde(default)]
    pub contains_baton: bool,
}

impl TokenResponse {
    /// Newer indexers put genesis info at the top level, older ones nest it.
    pub fn genesis_info(&self) -> Option<&TokenGenesisInfo> {
        self.genesis_info.as_ref().or_else(|| {
            self.slp_tx_data
                .as_ref()
                .and_then(|data| data.genesis_info.as_ref())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub outpoint: OutPoint,
    /// -1 for mempool utxos.
    #[serde(default = "unconfirmed_height", deserialize_with = "i64_from_any")]
    pub block_height: i64,
    #[serde(default)]
    pub is_coinbase: bool,
    #[serde(deserialize_with = "u64_from_any")]
    pub value: u64,
    #[serde(default)]
    pub slp_meta: Option<SlpMeta>,
    #[serde(default, alias = "token")]
    pub slp_token: Option<SlpToken>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

fn unconfirmed_height() -> i64 {
    -1
}

/// One page of an address's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxHistoryPage {
    pub txs: Vec<Tx>,
    #[serde(default)]
    pub num_pages: u32,
}
