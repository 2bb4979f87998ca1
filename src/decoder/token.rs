use serde::Serialize;

use crate::chronik::TokenGenesisInfo;

/// Maximum decimal places a token may declare.
pub const MAX_TOKEN_DECIMALS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenProtocol {
    Slp,
    Alp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenTxType {
    Genesis,
    Mint,
    Send,
    Burn,
}

impl TokenTxType {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            b"GENESIS" => Some(Self::Genesis),
            b"MINT" => Some(Self::Mint),
            b"SEND" => Some(Self::Send),
            b"BURN" => Some(Self::Burn),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Genesis => "GENESIS",
            Self::Mint => "MINT",
            Self::Send => "SEND",
            Self::Burn => "BURN",
        }
    }
}

/// One token action decoded from an OP_RETURN. SLP carries exactly one,
/// an eMPP output may carry several ALP sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSection {
    pub protocol: TokenProtocol,
    pub token_type: u8,
    pub tx_type: TokenTxType,
    /// `None` for GENESIS: the token id is the txid of the carrying tx.
    pub token_id: Option<String>,
    pub genesis_info: Option<TokenGenesisInfo>,
    /// (output index, raw amount) for every output this section colors.
    pub output_amounts: Vec<(u32, u64)>,
    pub mint_baton_outputs: Vec<u32>,
    /// ALP BURN only.
    pub burn_amount: Option<u64>,
}

impl TokenSection {
    pub fn resolved_token_id(&self, txid: &str) -> String {
        self.token_id.clone().unwrap_or_else(|| txid.to_string())
    }

    pub fn total_output(&self) -> u128 {
        self.output_amounts.iter().map(|(_, a)| *a as u128).sum()
    }
}

/// Build the (output index, amount) list for amounts that color outputs
/// 1, 2, 3, ... in order. Zero amounts color nothing.
pub(crate) fn sequential_outputs(amounts: &[u64]) -> Vec<(u32, u64)> {
    amounts
        .iter()
        .enumerate()
        .filter(|(_, amount)| **amount > 0)
        .map(|(i, amount)| (i as u32 + 1, *amount))
        .collect()
}

/// Token ids are rendered as 64 hex chars; ALP stores them byte-reversed.
pub(crate) fn token_id_hex(bytes: &[u8], reversed: bool) -> String {
    if reversed {
        let mut rev = bytes.to_vec();
        rev.reverse();
        hex::encode(rev)
    } else {
        hex::encode(bytes)
    }
}
