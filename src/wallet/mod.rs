pub mod address;
pub mod utxos;

use std::collections::HashSet;

use crate::error::CashAddressError;

pub use address::{script_hash, script_to_address, AddressType};
pub use utxos::{organize, OrganizedUtxos, TokenBearing};

/// The set of hash160s a wallet controls. A script belongs to the wallet
/// when it is p2pkh or p2sh over one of these hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletHashes {
    hashes: HashSet<String>,
}

impl WalletHashes {
    pub fn new<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hashes: hashes
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Build from raw hashes plus cashaddrs, decoding the latter.
    pub fn from_config(hashes: &[String], addresses: &[String]) -> Result<Self, CashAddressError> {
        let mut wallet = Self::new(hashes);
        for address in addresses {
            let (_, hash) = address::decode_cash_address(address)?;
            wallet.hashes.insert(hex::encode(hash));
        }
        tracing::debug!(hashes = wallet.hashes.len(), "Built wallet hash set");
        Ok(wallet)
    }

    pub fn contains_hash(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn owns_script(&self, script_hex: &str) -> bool {
        script_hash(script_hex)
            .map(|(_, hash)| self.hashes.contains(&hash.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
