use std::collections::HashMap;
use std::future::Future;

use futures::future::join_all;

use crate::chronik::TokenResponse;
use crate::error::TokenError;

use super::registry::TokenCache;

/// Where uncached token metadata comes from. The live indexer client is an
/// implementation; so is a JSON dump of token responses.
pub trait TokenSource {
    fn fetch_token(
        &self,
        token_id: &str,
    ) -> impl Future<Output = Result<TokenResponse, TokenError>> + Send;
}

/// Token responses loaded up front, keyed by token id.
#[derive(Debug, Clone, Default)]
pub struct JsonTokenSource {
    responses: HashMap<String, TokenResponse>,
}

impl JsonTokenSource {
    pub fn new(responses: HashMap<String, TokenResponse>) -> Self {
        Self { responses }
    }

    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read token dump '{}': {}", path, e))?;
        let responses: HashMap<String, TokenResponse> = serde_json::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse token dump '{}': {}", path, e))?;
        tracing::info!(tokens = responses.len(), path, "Loaded token dump");
        Ok(Self { responses })
    }
}

impl TokenSource for JsonTokenSource {
    fn fetch_token(
        &self,
        token_id: &str,
    ) -> impl Future<Output = Result<TokenResponse, TokenError>> + Send {
        let result = self
            .responses
            .get(token_id)
            .cloned()
            .ok_or_else(|| TokenError::Source {
                token_id: token_id.to_string(),
                reason: "not present in token dump".to_string(),
            });
        async move { result }
    }
}

/// Fetch every uncached id concurrently and cache its genesis info.
/// Failed lookups are logged and left uncached. Returns how many tokens
/// were added.
pub async fn resolve_missing<S: TokenSource>(
    cache: &TokenCache,
    source: &S,
    token_ids: &[String],
) -> usize {
    let missing = cache.missing(token_ids.iter().map(String::as_str));
    if missing.is_empty() {
        return 0;
    }

    let results = join_all(missing.iter().map(|id| source.fetch_token(id))).await;

    let mut added = 0;
    for (token_id, result) in missing.iter().zip(results) {
        match result {
            Ok(response) => match response.genesis_info() {
                Some(info) => {
                    if cache.insert_if_absent(token_id, info.clone()) {
                        added += 1;
                    }
                }
                None => {
                    tracing::warn!(token_id = %token_id, "Token response has no genesis info");
                }
            },
            Err(e) => {
                tracing::warn!(token_id = %token_id, error = %e, "Failed to fetch token info");
            }
        }
    }

    tracing::info!(requested = missing.len(), added, "Resolved uncached tokens");
    added
}
