use serde::Deserialize;

use crate::decoder::token::MAX_TOKEN_DECIMALS;
use crate::wallet::address::decode_cash_address;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub wallet: WalletConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub app: AppConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

/// The addresses whose history is being parsed, as raw hash160s and/or
/// cashaddrs.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WalletConfig {
    #[serde(default)]
    pub hashes: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_count")]
    pub count: usize,
    #[serde(default)]
    pub unconfirmed_first: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            count: default_history_count(),
            unconfirmed_first: false,
        }
    }
}

fn default_history_count() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_cash_decimals")]
    pub cash_decimals: u8,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cash_decimals: default_cash_decimals(),
        }
    }
}

fn default_cash_decimals() -> u8 {
    2
}

/// JSON dumps produced by an indexer client.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// One file per address, each a history page or a bare tx array.
    pub history: Vec<String>,
    pub utxos: Option<String>,
    /// Token endpoint responses keyed by token id.
    pub tokens: Option<String>,
}

/// Genesis info known ahead of time, seeded into the token cache.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub token_id: String,
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hash: String,
    pub decimals: u8,
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.wallet.hashes.is_empty() && self.wallet.addresses.is_empty() {
            return Err(eyre::eyre!("Wallet must list at least one hash or address"));
        }
        for hash in &self.wallet.hashes {
            if !is_hex_of_len(hash, 40) {
                return Err(eyre::eyre!("Invalid wallet hash160 '{}'", hash));
            }
        }
        for address in &self.wallet.addresses {
            decode_cash_address(address)
                .map_err(|e| eyre::eyre!("Invalid wallet address '{}': {}", address, e))?;
        }
        if self.history.count == 0 {
            return Err(eyre::eyre!("history.count must be at least 1"));
        }
        if self.app.cash_decimals > MAX_TOKEN_DECIMALS {
            return Err(eyre::eyre!(
                "app.cash_decimals must be at most {}, got {}",
                MAX_TOKEN_DECIMALS,
                self.app.cash_decimals
            ));
        }
        if self.input.history.is_empty() {
            return Err(eyre::eyre!("input.history must name at least one file"));
        }
        for token in &self.tokens {
            if !is_hex_of_len(&token.token_id, 64) {
                return Err(eyre::eyre!(
                    "Invalid token id '{}' for {}",
                    token.token_id,
                    token.ticker
                ));
            }
            if token.decimals > MAX_TOKEN_DECIMALS {
                return Err(eyre::eyre!(
                    "Token {} declares {} decimals, max is {}",
                    token.ticker,
                    token.decimals,
                    MAX_TOKEN_DECIMALS
                ));
            }
        }
        Ok(())
    }
}
