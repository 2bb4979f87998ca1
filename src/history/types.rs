use serde::Serialize;

use crate::decoder::{AppLokad, TokenProtocol, TokenTxType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum XecTxType {
    Received,
    Sent,
    #[serde(rename = "Coinbase Reward")]
    Coinbase,
    #[serde(rename = "Staking Reward")]
    Staking,
}

impl XecTxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            XecTxType::Received => "Received",
            XecTxType::Sent => "Sent",
            XecTxType::Coinbase => "Coinbase Reward",
            XecTxType::Staking => "Staking Reward",
        }
    }
}

/// What a transaction is, at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProtocolLabel {
    /// Plain XEC movement, no OP_RETURN (or one carrying nothing we parse).
    Xec,
    Token {
        protocol: TokenProtocol,
        #[serde(rename = "txType")]
        tx_type: RenderedTxType,
    },
    App { app: AppLokad },
    /// Recognised app prefix whose pushes do not follow its format.
    OffSpec { app: AppLokad },
    /// OP_RETURN text without a LOKAD prefix.
    External,
    /// 4-byte prefix we do not know.
    Unknown,
}

/// How a token entry is shown. Marketplace and collection txs get their
/// own labels on top of the four protocol tx types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RenderedTxType {
    #[serde(rename = "GENESIS")]
    Genesis,
    #[serde(rename = "MINT")]
    Mint,
    #[serde(rename = "SEND")]
    Send,
    #[serde(rename = "BURN")]
    Burn,
    #[serde(rename = "Agora Offer")]
    AgoraOffer,
    #[serde(rename = "Agora Cancel")]
    AgoraCancel,
    #[serde(rename = "Agora Buy")]
    AgoraBuy,
    #[serde(rename = "Agora Sale")]
    AgoraSale,
    #[serde(rename = "Fan Out")]
    FanOut,
}

impl From<TokenTxType> for RenderedTxType {
    fn from(tx_type: TokenTxType) -> Self {
        match tx_type {
            TokenTxType::Genesis => RenderedTxType::Genesis,
            TokenTxType::Mint => RenderedTxType::Mint,
            TokenTxType::Send => RenderedTxType::Send,
            TokenTxType::Burn => RenderedTxType::Burn,
        }
    }
}

/// Decoded payload of an app OP_RETURN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionData {
    #[serde(rename_all = "camelCase")]
    Alias { alias: String, address: String },
    #[serde(rename_all = "camelCase")]
    Airdrop {
        token_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    PayButton { data: String, nonce: String },
    Message { msg: String },
    #[serde(rename_all = "camelCase")]
    Paywall { shared_article_txid: String },
    #[serde(rename_all = "camelCase")]
    ArticleReply { reply_article_txid: String, msg: String },
    #[serde(rename_all = "camelCase")]
    Swap { token_id: String },
    Stack { stack: String, decoded: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppAction {
    /// Hex LOKAD prefix, empty for external messages.
    pub lokad_id: String,
    pub app: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_valid: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTokenEntry {
    pub token_id: String,
    pub protocol: TokenProtocol,
    /// Any tx that destroys tokens renders as BURN.
    pub rendered_tx_type: RenderedTxType,
    /// Raw amount for this entry.
    pub token_satoshis: String,
    /// `token_satoshis` in human units, when decimals are known.
    pub amount: Option<String>,
    pub ticker: Option<String>,
    pub mint_baton_outputs: Vec<u32>,
    pub genesis_info_missing: bool,
    /// Child NFT inputs a collection fan-out prepared for the wallet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nft_fan_inputs_created: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTx {
    pub txid: String,
    pub direction: Direction,
    pub xec_tx_type: XecTxType,
    pub satoshis_sent: u64,
    /// `satoshis_sent` in XEC.
    pub xec_amount: String,
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_address: Option<String>,
    pub protocol: ProtocolLabel,
    /// Hex stack array of the OP_RETURN output, if any.
    pub stack_array: Vec<String>,
    pub app_actions: Vec<AppAction>,
    pub token_entries: Vec<ParsedTokenEntry>,
    /// Set when the OP_RETURN carried a token payload that failed to parse,
    /// or that the indexer did not confirm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_payload_error: Option<String>,
}

impl ParsedTx {
    pub fn is_token_tx(&self) -> bool {
        !self.token_entries.is_empty()
    }
}
