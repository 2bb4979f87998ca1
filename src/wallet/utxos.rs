use serde::Serialize;

use crate::chronik::Utxo;

/// Anything that may carry a token amount or mint baton.
pub trait TokenBearing {
    fn has_token(&self) -> bool;
}

impl TokenBearing for Utxo {
    fn has_token(&self) -> bool {
        self.slp_token.is_some()
    }
}

/// Raw indexer objects: token-bearing when a `token` or `slpToken` key is
/// present and not null.
impl TokenBearing for serde_json::Value {
    fn has_token(&self) -> bool {
        ["token", "slpToken"]
            .iter()
            .any(|key| self.get(key).is_some_and(|v| !v.is_null()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizedUtxos<T> {
    pub slp_utxos: Vec<T>,
    pub non_slp_utxos: Vec<T>,
}

/// Split utxos into token-bearing and plain ones, keeping relative order.
pub fn organize<T: TokenBearing>(utxos: impl IntoIterator<Item = T>) -> OrganizedUtxos<T> {
    let (slp_utxos, non_slp_utxos): (Vec<T>, Vec<T>) =
        utxos.into_iter().partition(|utxo| utxo.has_token());
    OrganizedUtxos {
        slp_utxos,
        non_slp_utxos,
    }
}
