use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::chronik::TokenGenesisInfo;
use crate::config::TokenConfig;
use crate::error::TokenError;

/// Genesis info by token id. Entries are written once and never change;
/// the whole cache is dropped on wallet switch.
#[derive(Debug, Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<String, TokenGenesisInfo>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cache with the tokens listed in config.
    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        let cache = Self::new();
        for token in tokens {
            let inserted = cache.insert_if_absent(
                &token.token_id,
                TokenGenesisInfo {
                    token_ticker: token.ticker.clone(),
                    token_name: token.name.clone(),
                    token_document_url: token.url.clone(),
                    token_document_hash: token.hash.clone(),
                    decimals: token.decimals,
                },
            );
            if !inserted {
                tracing::warn!(
                    token_id = %token.token_id,
                    ticker = %token.ticker,
                    "Duplicate token in config, keeping first entry"
                );
            }
        }
        tracing::info!(tokens = cache.len(), "Seeded token cache");
        cache
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, TokenGenesisInfo>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, TokenGenesisInfo>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn resolve(&self, token_id: &str) -> Result<TokenGenesisInfo, TokenError> {
        self.read()
            .get(token_id)
            .cloned()
            .ok_or_else(|| TokenError::NotFound(token_id.to_string()))
    }

    pub fn contains(&self, token_id: &str) -> bool {
        self.read().contains_key(token_id)
    }

    /// Insert unless the token is already cached. Returns whether this call
    /// inserted.
    pub fn insert_if_absent(&self, token_id: &str, info: TokenGenesisInfo) -> bool {
        let mut entries = self.write();
        if entries.contains_key(token_id) {
            return false;
        }
        tracing::debug!(
            token_id = %token_id,
            ticker = %info.token_ticker,
            decimals = info.decimals,
            "Cached token genesis info"
        );
        entries.insert(token_id.to_string(), info);
        true
    }

    /// Ids from `token_ids` not yet cached, deduplicated, in first-seen order.
    pub fn missing<'a>(&self, token_ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let entries = self.read();
        let mut missing: Vec<String> = Vec::new();
        for token_id in token_ids {
            if !entries.contains_key(token_id) && !missing.iter().any(|m| m == token_id) {
                missing.push(token_id.to_string());
            }
        }
        missing
    }

    pub fn clear(&self) {
        let mut entries = self.write();
        tracing::debug!(tokens = entries.len(), "Clearing token cache");
        entries.clear();
    }

    /// Owned copy for a classification pass.
    pub fn snapshot(&self) -> HashMap<String, TokenGenesisInfo> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
