//! Token entries of a classified tx.
//!
//! The indexer decides which token actions are valid. Its annotations drive
//! every entry, and amounts come from its per-output colorings. The decoded
//! OP_RETURN is only cross-checked: a section the indexer never annotated is
//! reported as an error and produces no entry.

use std::collections::HashMap;

use bigdecimal::num_bigint::BigInt;

use crate::chronik::{SlpToken, TokenEntry, TokenGenesisInfo, Tx};
use crate::decoder::script::{parse_script_hex, Op, OP_0};
use crate::decoder::{TokenProtocol, TokenSection, TokenTxType};
use crate::error::TokenPayloadError;
use crate::tokens::amount::render_scaled;
use crate::wallet::address::{decode_cash_address, script_hash, AddressType};
use crate::wallet::WalletHashes;

use super::types::{Direction, ParsedTokenEntry, RenderedTxType};

/// Outputs at or below this value are dust.
const DUST_SATS: u64 = 546;

/// SLP NFT1 group tokens are collections.
const NFT1_GROUP_TOKEN_TYPE: u32 = 0x81;
const NFT1_CHILD_TOKEN_TYPE: u32 = 0x41;
const FUNGIBLE_TOKEN_TYPE: u32 = 0x01;

/// What the rest of the tx looks like, as seen by the token entry builder.
pub(super) struct TxView<'a> {
    pub tx: &'a Tx,
    pub wallet: &'a WalletHashes,
    pub direction: Direction,
    pub satoshis_sent: u64,
    pub recipients: &'a [String],
    /// Hex stack array of the OP_RETURN output.
    pub stack: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgoraAction {
    Offer,
    Cancel,
    Purchase,
}

/// A token action the indexer accepted.
struct Validated {
    token_id: String,
    protocol: Option<TokenProtocol>,
    token_type: u32,
    tx_type: Option<TokenTxType>,
    /// Raw tokens destroyed, when the tx burns.
    burned: Option<u128>,
}

/// Token totals of the outputs one token colors.
#[derive(Default)]
struct Colored {
    total: u128,
    received: u128,
    to_p2pkh: u128,
    wallet_singles: u32,
    batons: Vec<u32>,
}

/// Build the token entries of `view.tx`. The second value lists token
/// sections and annotations that did not make it into an entry.
pub(super) fn token_entries(
    view: &TxView<'_>,
    sections: &[&TokenSection],
    token_info: &HashMap<String, TokenGenesisInfo>,
) -> (Vec<ParsedTokenEntry>, Vec<TokenPayloadError>) {
    let tx = view.tx;
    let mut errors = Vec::new();
    let (validated, annotated) = validated_actions(tx, &mut errors);

    for section in sections {
        let token_id = section.resolved_token_id(&tx.txid);
        if !annotated.contains(&token_id) {
            errors.push(TokenPayloadError::Unvalidated {
                token_id,
                tx_type: section.tx_type.as_str(),
            });
        }
    }

    let agora = agora_action(view);
    let legacy_id = tx
        .slp_tx_data
        .as_ref()
        .map(|data| data.slp_meta.token_id.as_str());

    let mut entries = Vec::new();
    for action in validated {
        let section = sections
            .iter()
            .find(|section| section.resolved_token_id(&tx.txid) == action.token_id);
        let colored = colored(tx, view.wallet, &action.token_id, legacy_id);
        if let Some(section) = section.filter(|section| section.total_output() != colored.total) {
            tracing::debug!(
                txid = %tx.txid,
                token_id = %action.token_id,
                payload = section.total_output(),
                colored = colored.total,
                "Indexer colored a different amount than the payload names"
            );
        }

        let mut rendered = match (action.tx_type, action.burned) {
            (Some(tx_type), _) => RenderedTxType::from(tx_type),
            (None, Some(_)) => RenderedTxType::Burn,
            (None, None) => {
                tracing::debug!(
                    txid = %tx.txid,
                    token_id = %action.token_id,
                    "No token action to render"
                );
                continue;
            }
        };
        match agora {
            Some(AgoraAction::Offer) => rendered = RenderedTxType::AgoraOffer,
            Some(AgoraAction::Cancel) => rendered = RenderedTxType::AgoraCancel,
            Some(AgoraAction::Purchase) => {
                rendered = match view.direction {
                    Direction::Incoming => RenderedTxType::AgoraSale,
                    Direction::Outgoing => RenderedTxType::AgoraBuy,
                }
            }
            None => {}
        }
        let fan_out = action.protocol != Some(TokenProtocol::Alp)
            && action.token_type == NFT1_GROUP_TOKEN_TYPE
            && action.tx_type == Some(TokenTxType::Send);
        if fan_out {
            rendered = RenderedTxType::FanOut;
        }

        let mut token_satoshis = match rendered {
            RenderedTxType::AgoraSale => colored.to_p2pkh,
            RenderedTxType::AgoraBuy => colored.received,
            RenderedTxType::AgoraCancel => colored.total,
            _ => match action.tx_type {
                Some(TokenTxType::Genesis | TokenTxType::Mint) => colored.total,
                Some(TokenTxType::Send) => match view.direction {
                    Direction::Incoming => colored.received,
                    Direction::Outgoing => colored.total.saturating_sub(colored.received),
                },
                Some(TokenTxType::Burn) | None => action.burned.unwrap_or(0),
            },
        };
        if let Some(burned) = action.burned {
            rendered = RenderedTxType::Burn;
            token_satoshis = burned;
        }

        let info = match action.tx_type {
            Some(TokenTxType::Genesis) => {
                let indexed = tx
                    .slp_tx_data
                    .as_ref()
                    .and_then(|data| data.genesis_info.clone());
                section
                    .and_then(|section| section.genesis_info.clone())
                    .or(indexed)
            }
            _ => token_info.get(&action.token_id).cloned(),
        };
        let protocol = action
            .protocol
            .or_else(|| section.map(|section| section.protocol))
            .unwrap_or(TokenProtocol::Slp);

        let amount = info
            .as_ref()
            .map(|info| render_scaled(&BigInt::from(token_satoshis), info.decimals));
        entries.push(ParsedTokenEntry {
            token_id: action.token_id,
            protocol,
            rendered_tx_type: rendered,
            token_satoshis: token_satoshis.to_string(),
            amount,
            ticker: info.as_ref().map(|info| info.token_ticker.clone()),
            mint_baton_outputs: colored.batons,
            genesis_info_missing: info.is_none(),
            nft_fan_inputs_created: fan_out.then_some(colored.wallet_singles),
        });
    }

    (entries, errors)
}

/// Token actions the indexer accepted, and every token id it annotated at
/// all. Rejected annotations are pushed onto `errors`.
fn validated_actions(
    tx: &Tx,
    errors: &mut Vec<TokenPayloadError>,
) -> (Vec<Validated>, Vec<String>) {
    let mut annotated = Vec::new();
    let mut validated = Vec::new();

    if !tx.token_entries.is_empty() {
        for entry in &tx.token_entries {
            annotated.push(entry.token_id.clone());
            if entry.is_invalid {
                errors.push(TokenPayloadError::RejectedByIndexer {
                    token_id: entry.token_id.clone(),
                    tx_type: entry.tx_type.clone(),
                });
                continue;
            }
            validated.push(from_token_entry(tx, entry));
        }
        return (validated, annotated);
    }

    // Older indexers: one token in `slp_tx_data`, burns on the inputs.
    let mut burns: Vec<(String, u128)> = Vec::new();
    for input in &tx.inputs {
        let Some(burn) = &input.slp_burn else {
            continue;
        };
        let amount = raw_amount(&tx.txid, &burn.token.amount);
        match burns.iter_mut().find(|(id, _)| *id == burn.token_id) {
            Some((_, total)) => *total += amount,
            None => burns.push((burn.token_id.clone(), amount)),
        }
    }

    if let Some(data) = &tx.slp_tx_data {
        let meta = &data.slp_meta;
        let burn_pos = burns.iter().position(|(id, _)| *id == meta.token_id);
        let burned = burn_pos.map(|pos| burns.remove(pos).1).filter(|amount| *amount > 0);
        annotated.push(meta.token_id.clone());
        validated.push(Validated {
            token_id: meta.token_id.clone(),
            protocol: Some(TokenProtocol::Slp),
            token_type: legacy_token_type(&meta.token_type),
            tx_type: TokenTxType::from_bytes(meta.tx_type.as_bytes()),
            burned,
        });
    }

    for (token_id, burned) in burns {
        annotated.push(token_id.clone());
        validated.push(Validated {
            token_id,
            protocol: Some(TokenProtocol::Slp),
            token_type: FUNGIBLE_TOKEN_TYPE,
            tx_type: None,
            burned: Some(burned),
        });
    }

    (validated, annotated)
}

fn from_token_entry(tx: &Tx, entry: &TokenEntry) -> Validated {
    let tx_type = TokenTxType::from_bytes(entry.tx_type.as_bytes());
    let burned = (entry.is_burn() || tx_type == Some(TokenTxType::Burn))
        .then(|| raw_amount(&tx.txid, &entry.actual_burn_amount));
    let (protocol, token_type) = match &entry.token_type {
        Some(token_type) if token_type.protocol == "ALP" => {
            (Some(TokenProtocol::Alp), token_type.number)
        }
        Some(token_type) => (Some(TokenProtocol::Slp), token_type.number),
        None => (None, FUNGIBLE_TOKEN_TYPE),
    };
    Validated {
        token_id: entry.token_id.clone(),
        protocol,
        token_type,
        tx_type,
        burned,
    }
}

fn legacy_token_type(name: &str) -> u32 {
    match name {
        "NFT1_GROUP" => NFT1_GROUP_TOKEN_TYPE,
        "NFT1_CHILD" => NFT1_CHILD_TOKEN_TYPE,
        _ => FUNGIBLE_TOKEN_TYPE,
    }
}

fn raw_amount(txid: &str, raw: &str) -> u128 {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(txid = %txid, amount = %raw, "Unreadable token amount");
        0
    })
}

/// Sum the outputs the indexer colored with `token_id`. Legacy colorings
/// carry no token id and belong to the tx's single `slp_tx_data` token.
fn colored(tx: &Tx, wallet: &WalletHashes, token_id: &str, legacy_id: Option<&str>) -> Colored {
    let belongs = |token: &&SlpToken| token.token_id.as_deref().or(legacy_id) == Some(token_id);
    let mut colored = Colored::default();
    for (idx, output) in tx.outputs.iter().enumerate() {
        let Some(token) = output.slp_token.as_ref().filter(belongs) else {
            continue;
        };
        if token.is_mint_baton {
            colored.batons.push(idx as u32);
            continue;
        }
        let amount = raw_amount(&tx.txid, &token.amount);
        colored.total += amount;
        if matches!(script_hash(&output.output_script), Some((AddressType::P2pkh, _))) {
            colored.to_p2pkh += amount;
        }
        if wallet.owns_script(&output.output_script) {
            colored.received += amount;
            if amount == 1 {
                colored.wallet_singles += 1;
            }
        }
    }
    colored
}

/// Agora marketplace role of the tx, if any.
///
/// Spending a token from a p2sh offer is a purchase, unless the unlocking
/// script selects the cancel path with an `OP_0` before the redeem script.
/// A new offer either sends one token output above dust to a single p2sh
/// recipient, or is an ALP listing with an `AGR0` push.
fn agora_action(view: &TxView<'_>) -> Option<AgoraAction> {
    let mut cancel = false;
    let mut purchase = false;
    for input in view.tx.inputs.iter().filter(|input| input.slp_token.is_some()) {
        let spends_p2sh = input
            .output_script
            .as_deref()
            .and_then(script_hash)
            .is_some_and(|(kind, _)| kind == AddressType::P2sh);
        if !spends_p2sh {
            continue;
        }
        let Ok(ops) = parse_script_hex(&input.input_script) else {
            continue;
        };
        match ops.len().checked_sub(2).map(|idx| &ops[idx]) {
            Some(Op::Push { opcode: OP_0, .. }) => cancel = true,
            _ => purchase = true,
        }
    }
    if purchase {
        return Some(AgoraAction::Purchase);
    }
    if cancel {
        return Some(AgoraAction::Cancel);
    }

    let is_token_tx = view.tx.inputs.iter().any(|input| input.slp_token.is_some());
    let first_recipient_p2sh = view
        .recipients
        .first()
        .is_some_and(|address| is_p2sh(address));
    let ad_setup = is_token_tx
        && view.satoshis_sent > DUST_SATS
        && view.recipients.len() == 1
        && first_recipient_p2sh;
    let alp_listing = view.stack.len() == 3
        && view.stack[0] == "50"
        && view.stack[1].starts_with("41")
        && view.stack[2].starts_with("534c5032")
        && first_recipient_p2sh;

    (ad_setup || alp_listing).then_some(AgoraAction::Offer)
}

fn is_p2sh(address: &str) -> bool {
    matches!(decode_cash_address(address), Ok((AddressType::P2sh, _)))
}
