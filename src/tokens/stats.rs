use serde::Serialize;

use crate::chronik::{BlockMetadata, TokenGenesisInfo, TokenResponse, Tx};
use crate::error::TokenError;

use super::amount::{parse_raw, render_scaled, scale_amount};

/// Token supply figures in human units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSupply {
    pub token_id: Option<String>,
    pub decimals: u8,
    pub total_minted: String,
    pub total_burned: String,
    pub circulating_supply: String,
    pub initial_token_quantity: Option<String>,
    pub contains_baton: bool,
}

/// Scale the raw mint/burn totals of a token response and derive the
/// circulating supply (`minted - burned`).
pub fn token_stats(response: &TokenResponse) -> Result<TokenSupply, TokenError> {
    let token_id = response.token_id.clone();
    let decimals = response
        .genesis_info()
        .map(|info| info.decimals)
        .ok_or_else(|| TokenError::NotFound(token_id.clone().unwrap_or_default()))?;
    let stats = response
        .token_stats
        .as_ref()
        .ok_or_else(|| TokenError::NotFound(token_id.clone().unwrap_or_default()))?;

    let minted = parse_raw(&stats.total_minted)?;
    let burned = parse_raw(&stats.total_burned)?;
    let circulating = &minted - &burned;

    let initial_token_quantity = response
        .initial_token_quantity
        .as_deref()
        .map(|raw| scale_amount(raw, decimals))
        .transpose()?;

    Ok(TokenSupply {
        token_id,
        decimals,
        total_minted: render_scaled(&minted, decimals),
        total_burned: render_scaled(&burned, decimals),
        circulating_supply: render_scaled(&circulating, decimals),
        initial_token_quantity,
        contains_baton: response.contains_baton,
    })
}

/// What a wallet keeps about a token once it has looked it up: genesis
/// info plus the shape of the genesis tx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisSummary {
    pub token_id: String,
    pub genesis_info: TokenGenesisInfo,
    /// Decimalized, e.g. `0.000` for nothing minted at 3 decimals.
    pub genesis_supply: String,
    pub genesis_mint_batons: u32,
    /// Distinct scripts that received genesis outputs, in output order.
    pub genesis_output_scripts: Vec<String>,
    pub time_first_seen: i64,
    pub block: Option<BlockMetadata>,
}

pub fn summarize_genesis(
    token_id: &str,
    genesis_tx: &Tx,
    response: &TokenResponse,
) -> Result<GenesisSummary, TokenError> {
    let genesis_info = response
        .genesis_info()
        .cloned()
        .ok_or_else(|| TokenError::NotFound(token_id.to_string()))?;

    let mut supply = parse_raw("0")?;
    let mut batons = 0u32;
    let mut scripts: Vec<String> = Vec::new();

    for output in &genesis_tx.outputs {
        let Some(token) = &output.slp_token else {
            continue;
        };
        if token.token_id.as_deref().is_some_and(|id| id != token_id) {
            continue;
        }
        if !scripts.contains(&output.output_script) {
            scripts.push(output.output_script.clone());
        }
        if token.is_mint_baton {
            batons += 1;
        }
        supply += parse_raw(&token.amount)?;
    }

    Ok(GenesisSummary {
        token_id: token_id.to_string(),
        genesis_supply: render_scaled(&supply, genesis_info.decimals),
        genesis_info,
        genesis_mint_batons: batons,
        genesis_output_scripts: scripts,
        time_first_seen: response.time_first_seen,
        block: response.block.clone(),
    })
}
