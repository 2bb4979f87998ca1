use std::collections::HashMap;

use bigdecimal::num_bigint::BigInt;

use crate::chronik::{TokenGenesisInfo, Tx};
use crate::decoder::lokad::{ARTICLE_REPLY_MARKER, CASHTAB_MSG_LOKAD};
use crate::decoder::script::{parse_script_hex, stack_array};
use crate::decoder::{decode_op_return, AppLokad, EmppPush, OpReturn, TokenSection};
use crate::error::ClassifyError;
use crate::tokens::amount::render_scaled;
use crate::wallet::address::{encode_payload, script_to_address, AddressType, ECASH_PREFIX};
use crate::wallet::WalletHashes;

use super::token_entries::{token_entries, TxView};
use super::types::{ActionData, AppAction, Direction, ParsedTx, ProtocolLabel, XecTxType};

/// A coinbase paying the wallet 9%..11% of its outputs is a staking reward.
const STAKING_SHARE_MIN_PCT: u128 = 9;
const STAKING_SHARE_MAX_PCT: u128 = 11;

/// Version byte plus hash160.
const ALIAS_PAYLOAD_LEN: usize = 21;
const TOKEN_ID_LEN: usize = 32;

/// Classify one transaction from the point of view of `wallet`.
///
/// `token_info` supplies decimals for tokens other than the one a GENESIS
/// creates. `cash_decimals` is how many decimal places an XEC amount has.
///
/// Token entries follow the indexer's token annotations on `tx`. Only a
/// script that cannot be walked is an error; a token payload that breaks
/// protocol rules or was not validated, or an app payload that is off-spec,
/// still yields a `ParsedTx`.
pub fn classify(
    tx: &Tx,
    wallet: &WalletHashes,
    token_info: &HashMap<String, TokenGenesisInfo>,
    cash_decimals: u8,
) -> Result<ParsedTx, ClassifyError> {
    let op_return_script = tx
        .outputs
        .iter()
        .map(|output| output.output_script.as_str())
        .find(|script| script.starts_with("6a"));
    let op_return = match op_return_script {
        Some(script) => decode_op_return(script).map_err(|source| ClassifyError::Script {
            txid: tx.txid.clone(),
            source,
        })?,
        None => None,
    };

    if let Some(op_return) = &op_return {
        tracing::trace!(txid = %tx.txid, kind = op_return.kind(), "Decoded OP_RETURN");
    }

    let wallet_in = tx
        .inputs
        .iter()
        .filter(|input| {
            input
                .output_script
                .as_deref()
                .is_some_and(|script| wallet.owns_script(script))
        })
        .fold(0u64, |acc, input| acc.saturating_add(input.value));

    let mut wallet_out = 0u64;
    let mut output_total = 0u64;
    let mut self_send = true;
    let mut recipients: Vec<String> = Vec::new();
    for output in &tx.outputs {
        output_total = output_total.saturating_add(output.value);
        if output.output_script.starts_with("6a") {
            continue;
        }
        if wallet.owns_script(&output.output_script) {
            wallet_out = wallet_out.saturating_add(output.value);
        } else {
            self_send = false;
            if let Some(address) = script_to_address(&output.output_script) {
                if !recipients.contains(&address) {
                    recipients.push(address);
                }
            }
        }
    }

    // ties go to outgoing
    let direction = if wallet_out > wallet_in {
        Direction::Incoming
    } else {
        Direction::Outgoing
    };

    let satoshis_sent = if self_send {
        output_total
    } else if tx.is_coinbase || direction == Direction::Incoming {
        wallet_out
    } else {
        output_total.saturating_sub(wallet_out)
    };

    let xec_tx_type = if tx.is_coinbase {
        if is_staking_share(satoshis_sent, output_total) {
            XecTxType::Staking
        } else {
            XecTxType::Coinbase
        }
    } else {
        match direction {
            Direction::Incoming => XecTxType::Received,
            Direction::Outgoing => XecTxType::Sent,
        }
    };

    let reply_address = if xec_tx_type == XecTxType::Received {
        tx.inputs
            .first()
            .and_then(|input| input.output_script.as_deref())
            .and_then(script_to_address)
    } else {
        None
    };

    let mut protocol = ProtocolLabel::Xec;
    let mut app_actions = Vec::new();
    let mut payload_errors: Vec<String> = Vec::new();
    let mut stack_hex: Vec<String> = Vec::new();
    let mut sections: Vec<&TokenSection> = Vec::new();

    if let (Some(script), Some(op_return)) = (op_return_script, op_return.as_ref()) {
        stack_hex = parse_script_hex(script)
            .map(|ops| stack_array(&ops[1..]).iter().map(hex::encode).collect::<Vec<_>>())
            .unwrap_or_default();

        match op_return {
            OpReturn::Slp(Err(e)) => payload_errors.push(e.to_string()),
            OpReturn::Empp(pushes) => {
                payload_errors.extend(pushes.iter().filter_map(|push| match push {
                    EmppPush::Alp(Err(e)) => Some(e.to_string()),
                    _ => None,
                }));
            }
            OpReturn::App { lokad, stack } => {
                let action = parse_app_action(*lokad, stack);
                protocol = match action.is_valid {
                    Some(false) => ProtocolLabel::OffSpec { app: *lokad },
                    _ => ProtocolLabel::App { app: *lokad },
                };
                app_actions.push(action);
            }
            OpReturn::External { stack } => {
                protocol = ProtocolLabel::External;
                app_actions.push(stack_action(String::new(), "none", stack));
            }
            OpReturn::Unknown { stack } => {
                if let Some(prefix) = stack.first() {
                    protocol = ProtocolLabel::Unknown;
                    app_actions.push(stack_action(hex::encode(prefix), "unknown", stack));
                }
            }
            OpReturn::Slp(Ok(_)) => {}
        }
        sections = op_return.token_sections();
    }

    let view = TxView {
        tx,
        wallet,
        direction,
        satoshis_sent,
        recipients: &recipients,
        stack: &stack_hex,
    };
    let (token_entries, token_errors) = token_entries(&view, &sections, token_info);
    payload_errors.extend(token_errors.iter().map(ToString::to_string));
    for error in &payload_errors {
        tracing::debug!(txid = %tx.txid, error = %error, "Token payload not used");
    }

    if let Some(first) = token_entries.first() {
        protocol = ProtocolLabel::Token {
            protocol: first.protocol,
            tx_type: first.rendered_tx_type,
        };
    }

    Ok(ParsedTx {
        txid: tx.txid.clone(),
        direction,
        xec_tx_type,
        satoshis_sent,
        xec_amount: render_scaled(&BigInt::from(satoshis_sent), cash_decimals),
        recipients,
        reply_address,
        protocol,
        stack_array: stack_hex,
        app_actions,
        token_entries,
        token_payload_error: (!payload_errors.is_empty()).then(|| payload_errors.join("; ")),
    })
}

fn is_staking_share(share: u64, total: u64) -> bool {
    let share = share as u128;
    let total = total as u128;
    share >= total * STAKING_SHARE_MIN_PCT / 100 && share <= total * STAKING_SHARE_MAX_PCT / 100
}

fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn stack_action(lokad_id: String, app: &str, stack: &[Vec<u8>]) -> AppAction {
    AppAction {
        lokad_id,
        app: app.to_string(),
        is_valid: None,
        action: Some(ActionData::Stack {
            stack: stack.iter().map(hex::encode).collect::<Vec<_>>().join(" "),
            decoded: stack.iter().map(|el| utf8(el)).collect::<Vec<_>>().join(" "),
        }),
    }
}

fn app_action(
    lokad: &[u8],
    app: &str,
    is_valid: Option<bool>,
    action: Option<ActionData>,
) -> AppAction {
    AppAction {
        lokad_id: hex::encode(lokad),
        app: app.to_string(),
        is_valid,
        action,
    }
}

/// Decode the pushes after a known LOKAD prefix. `stack[0]` is the prefix.
fn parse_app_action(lokad: AppLokad, stack: &[Vec<u8>]) -> AppAction {
    let prefix = stack.first().map(Vec::as_slice).unwrap_or_default();
    let push = |i: usize| stack.get(i).map(Vec::as_slice);
    let is_zero = |bytes: &[u8]| bytes == [0x00];

    match lokad {
        AppLokad::Alias => {
            // version 0, alias, then version byte || hash160
            let parsed = match (push(1), push(2), push(3)) {
                (Some(version), Some(alias), Some(payload))
                    if is_zero(version) && payload.len() == ALIAS_PAYLOAD_LEN =>
                {
                    AddressType::from_version_byte(payload[0]).map(|_| ActionData::Alias {
                        alias: utf8(alias),
                        address: encode_payload(ECASH_PREFIX, payload),
                    })
                }
                _ => None,
            };
            let valid = parsed.is_some();
            app_action(prefix, "alias", Some(valid), parsed)
        }
        AppLokad::Airdrop => match push(1) {
            Some(token_id) if token_id.len() == TOKEN_ID_LEN => {
                let msg = push(2).map(|first| match push(3) {
                    Some(legacy) if first == CASHTAB_MSG_LOKAD => utf8(legacy),
                    _ => utf8(first),
                });
                let action = ActionData::Airdrop {
                    token_id: hex::encode(token_id),
                    msg,
                };
                app_action(prefix, "Airdrop", Some(true), Some(action))
            }
            _ => app_action(prefix, "Airdrop", Some(false), None),
        },
        AppLokad::PayButton => match (push(1), push(2), push(3)) {
            (Some(version), Some(data), Some(nonce)) if is_zero(version) => {
                let action = ActionData::PayButton {
                    data: if is_zero(data) { String::new() } else { utf8(data) },
                    nonce: if is_zero(nonce) {
                        String::new()
                    } else {
                        hex::encode(nonce)
                    },
                };
                app_action(prefix, "PayButton", Some(true), Some(action))
            }
            _ => app_action(prefix, "PayButton", Some(false), None),
        },
        AppLokad::CashtabEncrypted => app_action(prefix, "Cashtab Encrypted", None, None),
        AppLokad::Swap => {
            // signal (01) for an SLP atomic swap (01) names the token at [3]
            let action = match (push(1), push(2), push(3)) {
                (Some([0x01]), Some([0x01]), Some(token_id)) if token_id.len() == TOKEN_ID_LEN => {
                    Some(ActionData::Swap {
                        token_id: hex::encode(token_id),
                    })
                }
                _ => None,
            };
            app_action(prefix, "SWaP", None, action)
        }
        AppLokad::EcashChat => message_action(prefix, "eCashChat", push(1)),
        AppLokad::CashtabMsg => message_action(prefix, "Cashtab Msg", push(1)),
        AppLokad::Paywall => match push(1) {
            Some(txid) => {
                let action = ActionData::Paywall {
                    shared_article_txid: hex::encode(txid),
                };
                app_action(prefix, "Paywall", Some(true), Some(action))
            }
            None => app_action(prefix, "Paywall", Some(false), None),
        },
        AppLokad::Auth => app_action(prefix, "Auth", Some(true), None),
        AppLokad::Article => match push(1) {
            Some(marker) if marker == ARTICLE_REPLY_MARKER => {
                let app = "eCashChat Article Reply";
                match (stack.len(), push(2), push(3)) {
                    (4, Some(txid), Some(msg)) => {
                        let action = ActionData::ArticleReply {
                            reply_article_txid: hex::encode(txid),
                            msg: utf8(msg),
                        };
                        app_action(prefix, app, Some(true), Some(action))
                    }
                    _ => app_action(prefix, app, Some(false), None),
                }
            }
            Some(_) => app_action(prefix, "eCashChat Article", Some(true), None),
            None => app_action(prefix, "eCashChat Article", Some(false), None),
        },
    }
}

fn message_action(prefix: &[u8], app: &str, msg: Option<&[u8]>) -> AppAction {
    match msg {
        Some(msg) => app_action(
            prefix,
            app,
            Some(true),
            Some(ActionData::Message { msg: utf8(msg) }),
        ),
        None => app_action(prefix, app, Some(false), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chronik::{
        OutPoint, SlpBurn, SlpMeta, SlpToken, SlpTxData, TokenEntry, TokenType, TxInput,
        TxOutput,
    };
    use crate::decoder::TokenProtocol;
    use crate::error::ScriptParseError;
    use crate::history::types::RenderedTxType;
    use crate::wallet::address::encode_cash_address;

    const WALLET: &str = "95e79f51d4260bc0dc3ba7fb77c7be92d0fbdd1d";
    const OTHER: &str = "a5417349420ec53b27522fed1a63b1672c0f28ff";

    fn p2pkh(hash: &str) -> String {
        format!("76a914{}88ac", hash)
    }

    fn p2sh(hash: &str) -> String {
        format!("a914{}87", hash)
    }

    fn token(token_id: &str, amount: &str) -> Option<SlpToken> {
        Some(SlpToken {
            token_id: Some(token_id.to_string()),
            amount: amount.to_string(),
            is_mint_baton: false,
        })
    }

    fn colored(script: &str, value: u64, token_id: &str, amount: &str) -> TxOutput {
        TxOutput {
            slp_token: token(token_id, amount),
            ..output(script, value)
        }
    }

    fn token_input(script: &str, value: u64, token_id: &str, amount: &str) -> TxInput {
        TxInput {
            slp_token: token(token_id, amount),
            ..input(script, value)
        }
    }

    fn entry(token_id: &str, tx_type: &str, protocol: &str, number: u32) -> TokenEntry {
        let kind = match (protocol, number) {
            ("ALP", _) => "ALP_TOKEN_TYPE_STANDARD",
            (_, 0x81) => "SLP_TOKEN_TYPE_NFT1_GROUP",
            _ => "SLP_TOKEN_TYPE_FUNGIBLE",
        };
        TokenEntry {
            token_id: token_id.to_string(),
            token_type: Some(TokenType {
                protocol: protocol.to_string(),
                kind: kind.to_string(),
                number,
            }),
            tx_type: tx_type.to_string(),
            is_invalid: false,
            burn_summary: String::new(),
            actual_burn_amount: "0".to_string(),
            intentional_burn: "0".to_string(),
            burns_mint_batons: false,
        }
    }

    fn input(script: &str, value: u64) -> TxInput {
        TxInput {
            prev_out: OutPoint {
                txid: "11".repeat(32),
                out_idx: 0,
            },
            input_script: String::new(),
            output_script: Some(script.to_string()),
            value,
            sequence_no: 0xffff_ffff,
            slp_burn: None,
            slp_token: None,
        }
    }

    fn output(script: &str, value: u64) -> TxOutput {
        TxOutput {
            value,
            output_script: script.to_string(),
            slp_token: None,
            spent_by: None,
        }
    }

    fn tx(txid: &str, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Tx {
        Tx {
            txid: txid.to_string(),
            version: 2,
            inputs,
            outputs,
            lock_time: 0,
            slp_tx_data: None,
            token_entries: Vec::new(),
            token_status: None,
            block: None,
            time_first_seen: 0,
            size: 0,
            is_coinbase: false,
            network: Some("XEC".to_string()),
        }
    }

    fn wallet() -> WalletHashes {
        WalletHashes::new([WALLET])
    }

    fn no_tokens() -> HashMap<String, TokenGenesisInfo> {
        HashMap::new()
    }

    #[test]
    fn test_tabcash_genesis() {
        let hash = "b8d9512d2adf8b4e70c45c26b6b00d75c28eaa96";
        let txid = "50d8292c6255cda7afc6c8566fed3cf42a2794e9619740fe8f4c95431271410e";
        let mut baton = colored(&p2pkh(hash), 546, txid, "0");
        if let Some(token) = baton.slp_token.as_mut() {
            token.is_mint_baton = true;
        }
        let mut tx = tx(
            txid,
            vec![input(&p2pkh(hash), 91048)],
            vec![
                output(
                    "6a04534c500001010747454e455349530354424307746162636173681768747470733a2f2f636173687461626170702e636f6d2f4c0001000102080000000000000064",
                    0,
                ),
                colored(&p2pkh(hash), 546, txid, "100"),
                baton,
                output(&p2pkh(hash), 89406),
            ],
        );
        tx.token_entries = vec![entry(txid, "GENESIS", "SLP", 1)];

        let parsed = classify(&tx, &WalletHashes::new([hash]), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Outgoing);
        assert_eq!(parsed.xec_tx_type, XecTxType::Sent);
        assert_eq!(parsed.satoshis_sent, 90498);
        assert_eq!(parsed.xec_amount, "904.98");
        assert!(parsed.recipients.is_empty());
        assert_eq!(
            parsed.protocol,
            ProtocolLabel::Token {
                protocol: TokenProtocol::Slp,
                tx_type: RenderedTxType::Genesis
            }
        );

        let entry = &parsed.token_entries[0];
        assert_eq!(entry.token_id, txid);
        assert_eq!(entry.ticker.as_deref(), Some("TBC"));
        assert_eq!(entry.token_satoshis, "100");
        assert_eq!(entry.amount.as_deref(), Some("100"));
        assert_eq!(entry.mint_baton_outputs, vec![2]);
        assert!(!entry.genesis_info_missing);
    }

    #[test]
    fn test_incoming_xec() {
        let tx = tx(
            &"aa".repeat(32),
            vec![input(&p2pkh(OTHER), 5000)],
            vec![output(&p2pkh(WALLET), 1000), output(&p2pkh(OTHER), 3500)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let other_address = script_to_address(&p2pkh(OTHER)).unwrap();

        assert_eq!(parsed.direction, Direction::Incoming);
        assert_eq!(parsed.xec_tx_type, XecTxType::Received);
        assert_eq!(parsed.satoshis_sent, 1000);
        assert_eq!(parsed.xec_amount, "10.00");
        assert_eq!(parsed.protocol, ProtocolLabel::Xec);
        assert_eq!(parsed.reply_address.as_deref(), Some(other_address.as_str()));
        assert_eq!(parsed.recipients, vec![other_address]);
        assert!(parsed.stack_array.is_empty());
    }

    #[test]
    fn test_outgoing_xec() {
        let tx = tx(
            &"bb".repeat(32),
            vec![input(&p2pkh(WALLET), 5000)],
            vec![output(&p2pkh(OTHER), 1200), output(&p2pkh(WALLET), 3500)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Outgoing);
        assert_eq!(parsed.xec_tx_type, XecTxType::Sent);
        assert_eq!(parsed.satoshis_sent, 1200);
        assert_eq!(parsed.reply_address, None);
    }

    #[test]
    fn test_equal_in_and_out_is_outgoing() {
        let tx = tx(
            &"cc".repeat(32),
            vec![input(&p2pkh(WALLET), 1000), input(&p2pkh(OTHER), 500)],
            vec![output(&p2pkh(WALLET), 1000), output(&p2pkh(OTHER), 500)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Outgoing);
    }

    #[test]
    fn test_staking_reward_and_coinbase() {
        let mut staking = tx(
            &"dd".repeat(32),
            vec![],
            vec![output(&p2pkh(OTHER), 900_000), output(&p2pkh(WALLET), 100_000)],
        );
        staking.is_coinbase = true;
        let parsed = classify(&staking, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.xec_tx_type, XecTxType::Staking);
        assert_eq!(parsed.satoshis_sent, 100_000);

        let mut miner = staking.clone();
        miner.outputs[0].value = 100_000;
        let parsed = classify(&miner, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.xec_tx_type, XecTxType::Coinbase);
    }

    #[test]
    fn test_alias_registration() {
        let tx = tx(
            &"ee".repeat(32),
            vec![input(&p2pkh(WALLET), 10000)],
            vec![
                output("6a042e786563000131150076458db0ed96fe9863fc1ccec9fa2cfab884b0f6", 0),
                output(&p2pkh(OTHER), 554),
                output(&p2pkh(WALLET), 9000),
            ],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Alias });
        assert_eq!(
            parsed.stack_array,
            vec![
                "2e786563".to_string(),
                "00".to_string(),
                "31".to_string(),
                "0076458db0ed96fe9863fc1ccec9fa2cfab884b0f6".to_string(),
            ]
        );
        let hash = hex::decode("76458db0ed96fe9863fc1ccec9fa2cfab884b0f6").unwrap();
        assert_eq!(
            parsed.app_actions,
            vec![AppAction {
                lokad_id: "2e786563".to_string(),
                app: "alias".to_string(),
                is_valid: Some(true),
                action: Some(ActionData::Alias {
                    alias: "1".to_string(),
                    address: encode_cash_address("ecash", AddressType::P2pkh, &hash),
                }),
            }]
        );
    }

    #[test]
    fn test_alias_with_wrong_version_is_off_spec() {
        let tx = tx(
            &"ef".repeat(32),
            vec![input(&p2pkh(WALLET), 10000)],
            vec![
                output("6a042e786563510131150076458db0ed96fe9863fc1ccec9fa2cfab884b0f6", 0),
                output(&p2pkh(WALLET), 9000),
            ],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::OffSpec { app: AppLokad::Alias });
        assert_eq!(parsed.app_actions[0].is_valid, Some(false));
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_paybutton() {
        let tx = tx(
            &"f0".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![
                output("6a045041590000000863a9892c7792fbfd", 0),
                output(&p2pkh(WALLET), 9000),
            ],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::PayButton });
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::PayButton {
                data: String::new(),
                nonce: "63a9892c7792fbfd".to_string(),
            })
        );

        let mut bad_version = tx.clone();
        bad_version.outputs[0].output_script = "6a04504159005100".to_string();
        let parsed = classify(&bad_version, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::OffSpec { app: AppLokad::PayButton });
    }

    #[test]
    fn test_airdrop_with_legacy_message() {
        let token_id = "bdb3b4215ca0622e0c4c07655522c376eaa891838a82f0217fa453bb0595a37c";
        let script = format!("6a0464726f7020{}0400746162054869686969", token_id);
        let tx = tx(
            &"f1".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![output(&script, 0), output(&p2pkh(WALLET), 9000)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::Airdrop {
                token_id: token_id.to_string(),
                msg: Some("Hihii".to_string()),
            })
        );
    }

    #[test]
    fn test_electrum_message() {
        let tx = tx(
            &"f2".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![output("6a0568656c6c6f", 0), output(&p2pkh(WALLET), 9000)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::External);
        assert_eq!(parsed.app_actions[0].lokad_id, "");
        assert_eq!(parsed.app_actions[0].app, "none");
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::Stack {
                stack: "68656c6c6f".to_string(),
                decoded: "hello".to_string(),
            })
        );
    }

    #[test]
    fn test_truncated_op_return_is_a_script_error() {
        let tx = tx(
            &"f3".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![output("6a04534c50", 0), output(&p2pkh(WALLET), 9000)],
        );
        let err = classify(&tx, &wallet(), &no_tokens(), 2).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Script {
                source: ScriptParseError::TruncatedPush { .. },
                ..
            }
        ));
    }

    const SEND_SCRIPT: &str = "6a04534c500001010453454e44200daf200e3418f2df1158efef36fbb507f12928f1fdcf3543703e64e75a4a90730800000000004c4b40080000000002aea540";
    const SEND_TOKEN_ID: &str = "0daf200e3418f2df1158efef36fbb507f12928f1fdcf3543703e64e75a4a9073";
    const ALP_SEND_SCRIPT: &str = "6a5031534c5032000453454e4445e1f25de444e399b6d46fa66e3424c04549a85a14b12bc9a4ddc9cdcdcdcdcd01d00700000000";
    const ALP_TOKEN_ID: &str = "cdcdcdcdcdc9dda4c92bb1145aa84945c024346ea66fd4b699e344e45df2e145";
    const OFFER_HASH: &str = "d37c4c809fe9840e7bfa77b86bd47163f6fb6c60";

    /// A SEND of 5000000 to output 1 and 45000000 to output 2, annotated by
    /// the indexer.
    fn send_tx(
        txid: &str,
        inputs: Vec<TxInput>,
        first: &str,
        second: &str,
        change: TxOutput,
    ) -> Tx {
        let mut tx = tx(
            txid,
            inputs,
            vec![
                output(SEND_SCRIPT, 0),
                colored(first, 546, SEND_TOKEN_ID, "5000000"),
                colored(second, 546, SEND_TOKEN_ID, "45000000"),
                change,
            ],
        );
        tx.token_entries = vec![entry(SEND_TOKEN_ID, "SEND", "SLP", 1)];
        tx
    }

    #[test]
    fn test_incoming_token_send_with_and_without_cache() {
        let tx = send_tx(
            &"f4".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            &p2pkh(WALLET),
            &p2pkh(OTHER),
            output(&p2pkh(OTHER), 8000),
        );

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::Send);
        assert_eq!(entry.token_satoshis, "5000000");
        assert!(entry.genesis_info_missing);
        assert_eq!(entry.amount, None);
        assert_eq!(entry.nft_fan_inputs_created, None);
        assert_eq!(parsed.token_payload_error, None);

        let cache = HashMap::from([(
            SEND_TOKEN_ID.to_string(),
            TokenGenesisInfo {
                token_ticker: "TBS".to_string(),
                token_name: "TestBits".to_string(),
                token_document_url: String::new(),
                token_document_hash: String::new(),
                decimals: 2,
            },
        )]);
        let parsed = classify(&tx, &wallet(), &cache, 2).unwrap();
        assert_eq!(parsed.token_entries[0].amount.as_deref(), Some("50000.00"));
        assert_eq!(parsed.token_entries[0].ticker.as_deref(), Some("TBS"));
    }

    #[test]
    fn test_outgoing_token_send_counts_sent_minus_change() {
        let tx = send_tx(
            &"f5".repeat(32),
            vec![input(&p2pkh(WALLET), 10000)],
            &p2pkh(OTHER),
            &p2pkh(WALLET),
            output(&p2pkh(WALLET), 8000),
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Outgoing);
        assert_eq!(parsed.token_entries[0].token_satoshis, "5000000");
    }

    #[test]
    fn test_incoming_send_of_no_tokens_to_wallet_reports_zero() {
        let tx = send_tx(
            &"f6".repeat(32),
            vec![input(&p2pkh(OTHER), 100_000)],
            &p2pkh(OTHER),
            &p2pkh(OTHER),
            output(&p2pkh(WALLET), 90_000),
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Incoming);
        assert_eq!(parsed.token_entries.len(), 1);
        assert_eq!(parsed.token_entries[0].token_satoshis, "0");
        assert_eq!(
            parsed.protocol,
            ProtocolLabel::Token {
                protocol: TokenProtocol::Slp,
                tx_type: RenderedTxType::Send
            }
        );
    }

    #[test]
    fn test_send_without_indexer_annotations_is_not_rendered() {
        let mut tx = send_tx(
            &"e1".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            &p2pkh(WALLET),
            &p2pkh(OTHER),
            output(&p2pkh(OTHER), 8000),
        );
        tx.token_entries.clear();
        for output in tx.outputs.iter_mut() {
            output.slp_token = None;
        }

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert!(parsed.token_entries.is_empty());
        assert_eq!(parsed.protocol, ProtocolLabel::Xec);
        assert_eq!(
            parsed.token_payload_error,
            Some(format!(
                "SEND of token {} was not validated by the indexer",
                SEND_TOKEN_ID
            ))
        );
    }

    #[test]
    fn test_send_rejected_by_indexer_is_not_rendered() {
        let mut tx = send_tx(
            &"e2".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            &p2pkh(WALLET),
            &p2pkh(OTHER),
            output(&p2pkh(OTHER), 8000),
        );
        tx.token_entries[0].is_invalid = true;

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert!(parsed.token_entries.is_empty());
        assert_eq!(
            parsed.token_payload_error,
            Some(format!("indexer marked SEND of token {} invalid", SEND_TOKEN_ID))
        );
    }

    #[test]
    fn test_amounts_come_from_indexer_colorings() {
        // The indexer only colored 1000 of the 5000000 the payload names
        let mut tx = send_tx(
            &"e3".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            &p2pkh(WALLET),
            &p2pkh(OTHER),
            output(&p2pkh(OTHER), 8000),
        );
        tx.outputs[1].slp_token = token(SEND_TOKEN_ID, "1000");

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.token_entries[0].token_satoshis, "1000");
    }

    #[test]
    fn test_legacy_burn_annotation_renders_burn() {
        let mut burning = input(&p2pkh(WALLET), 546);
        burning.slp_burn = Some(SlpBurn {
            token: SlpToken {
                token_id: None,
                amount: "1000".to_string(),
                is_mint_baton: false,
            },
            token_id: SEND_TOKEN_ID.to_string(),
        });
        let mut tx = send_tx(
            &"f7".repeat(32),
            vec![burning, input(&p2pkh(WALLET), 10000)],
            &p2pkh(OTHER),
            &p2pkh(WALLET),
            output(&p2pkh(WALLET), 8000),
        );
        // Older indexers: no token entries, colorings without a token id
        tx.token_entries.clear();
        for output in tx.outputs.iter_mut() {
            if let Some(token) = output.slp_token.as_mut() {
                token.token_id = None;
            }
        }
        tx.slp_tx_data = Some(SlpTxData {
            slp_meta: SlpMeta {
                token_type: "FUNGIBLE".to_string(),
                tx_type: "SEND".to_string(),
                token_id: SEND_TOKEN_ID.to_string(),
                group_token_id: None,
            },
            genesis_info: None,
        });

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::Burn);
        assert_eq!(entry.token_satoshis, "1000");
        assert_eq!(
            parsed.protocol,
            ProtocolLabel::Token {
                protocol: TokenProtocol::Slp,
                tx_type: RenderedTxType::Burn
            }
        );

        // Without the burn the same annotations give a plain SEND
        let mut unburned = tx.clone();
        unburned.inputs[0].slp_burn = None;
        let parsed = classify(&unburned, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.token_entries[0].rendered_tx_type, RenderedTxType::Send);
        assert_eq!(parsed.token_entries[0].token_satoshis, "5000000");
    }

    #[test]
    fn test_unexpected_burn_overrides_send() {
        let mut tx = send_tx(
            &"e4".repeat(32),
            vec![input(&p2pkh(WALLET), 10000)],
            &p2pkh(OTHER),
            &p2pkh(WALLET),
            output(&p2pkh(WALLET), 8000),
        );
        tx.token_entries[0].burn_summary = "Unexpected burn: Burns 100 base tokens".to_string();
        tx.token_entries[0].actual_burn_amount = "100".to_string();

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.token_entries[0].rendered_tx_type, RenderedTxType::Burn);
        assert_eq!(parsed.token_entries[0].token_satoshis, "100");
    }

    #[test]
    fn test_alp_send_in_empp() {
        let mut tx = tx(
            &"f8".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![
                output(ALP_SEND_SCRIPT, 0),
                colored(&p2pkh(WALLET), 546, ALP_TOKEN_ID, "2000"),
                output(&p2pkh(OTHER), 9000),
            ],
        );
        tx.token_entries = vec![entry(ALP_TOKEN_ID, "SEND", "ALP", 0)];

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.token_id, ALP_TOKEN_ID);
        assert_eq!(entry.protocol, TokenProtocol::Alp);
        assert_eq!(entry.token_satoshis, "2000");
        assert_eq!(parsed.stack_array[0], "50");
    }

    #[test]
    fn test_invalid_token_payload_still_classifies() {
        let tx = tx(
            &"f9".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![output("6a04534c5000010104424f4f4d", 0), output(&p2pkh(WALLET), 9000)],
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.protocol, ProtocolLabel::Xec);
        assert!(parsed.token_entries.is_empty());
        assert_eq!(
            parsed.token_payload_error.as_deref(),
            Some("unknown token tx type 'BOOM'")
        );
    }

    /// Takes 5000000 out of a 50000000 offer: the buyer gets 5000000, the
    /// rest goes back to the offer script and the seller is paid 60000.
    fn agora_purchase() -> Tx {
        let mut offer = token_input(&p2sh(OFFER_HASH), 546, SEND_TOKEN_ID, "50000000");
        // signature, OP_1, redeem script
        offer.input_script = "02abcd5103515151".to_string();
        let mut tx = tx(
            &"a1".repeat(32),
            vec![offer, input(&p2pkh(OTHER), 100_000)],
            vec![
                output(SEND_SCRIPT, 0),
                colored(&p2pkh(OTHER), 546, SEND_TOKEN_ID, "5000000"),
                colored(&p2sh(OFFER_HASH), 546, SEND_TOKEN_ID, "45000000"),
                output(&p2pkh(WALLET), 60_000),
                output(&p2pkh(OTHER), 38_000),
            ],
        );
        tx.token_entries = vec![entry(SEND_TOKEN_ID, "SEND", "SLP", 1)];
        tx
    }

    #[test]
    fn test_agora_sale_counts_tokens_sent_to_p2pkh() {
        let parsed = classify(&agora_purchase(), &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Incoming);
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::AgoraSale);
        assert_eq!(entry.token_satoshis, "5000000");
    }

    #[test]
    fn test_agora_buy_counts_tokens_received() {
        let buyer = WalletHashes::new([OTHER]);
        let parsed = classify(&agora_purchase(), &buyer, &no_tokens(), 2).unwrap();
        assert_eq!(parsed.direction, Direction::Outgoing);
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::AgoraBuy);
        assert_eq!(entry.token_satoshis, "5000000");
        assert_eq!(
            parsed.protocol,
            ProtocolLabel::Token {
                protocol: TokenProtocol::Slp,
                tx_type: RenderedTxType::AgoraBuy
            }
        );
    }

    #[test]
    fn test_agora_cancel_counts_all_tokens() {
        let mut offer = token_input(&p2sh(OFFER_HASH), 546, SEND_TOKEN_ID, "50000000");
        // signature, OP_0, redeem script
        offer.input_script = "02abcd0003515151".to_string();
        let tx = send_tx(
            &"a2".repeat(32),
            vec![offer, input(&p2pkh(WALLET), 10000)],
            &p2pkh(WALLET),
            &p2pkh(WALLET),
            output(&p2pkh(WALLET), 9000),
        );
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::AgoraCancel);
        assert_eq!(entry.token_satoshis, "50000000");
    }

    #[test]
    fn test_agora_ad_setup_is_an_offer() {
        let tx = send_tx(
            &"a3".repeat(32),
            vec![
                token_input(&p2pkh(WALLET), 546, SEND_TOKEN_ID, "50000000"),
                input(&p2pkh(WALLET), 10000),
            ],
            &p2sh(OFFER_HASH),
            &p2pkh(WALLET),
            output(&p2pkh(WALLET), 9000),
        );
        let mut setup = tx.clone();
        setup.outputs[1].value = 1000;

        let parsed = classify(&setup, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.satoshis_sent, 1000);
        assert_eq!(parsed.token_entries[0].rendered_tx_type, RenderedTxType::AgoraOffer);
        assert_eq!(parsed.token_entries[0].token_satoshis, "5000000");

        // a dust-sized output to the p2sh is an ordinary SEND
        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.token_entries[0].rendered_tx_type, RenderedTxType::Send);
    }

    #[test]
    fn test_alp_agora_listing_is_an_offer() {
        let script = format!("6a50054147523000{}", &ALP_SEND_SCRIPT[4..]);
        let mut tx = tx(
            &"a4".repeat(32),
            vec![
                token_input(&p2pkh(WALLET), 546, ALP_TOKEN_ID, "2000"),
                input(&p2pkh(WALLET), 10000),
            ],
            vec![
                output(&script, 0),
                colored(&p2sh(OFFER_HASH), 546, ALP_TOKEN_ID, "2000"),
                output(&p2pkh(WALLET), 9000),
            ],
        );
        tx.token_entries = vec![entry(ALP_TOKEN_ID, "SEND", "ALP", 0)];

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        assert_eq!(parsed.stack_array.len(), 3);
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::AgoraOffer);
        assert_eq!(entry.protocol, TokenProtocol::Alp);
        assert_eq!(entry.token_satoshis, "2000");
    }

    #[test]
    fn test_collection_send_is_a_fan_out() {
        let group_id = "12".repeat(32);
        let amounts = ["01", "01", "01", "07"]
            .iter()
            .map(|amount| format!("0800000000000000{}", amount))
            .collect::<String>();
        let script = format!("6a04534c5000018104{}20{}{}", "53454e44", group_id, amounts);
        let mut tx = tx(
            &"a5".repeat(32),
            vec![
                token_input(&p2pkh(WALLET), 546, &group_id, "10"),
                input(&p2pkh(WALLET), 10000),
            ],
            vec![
                output(&script, 0),
                colored(&p2pkh(WALLET), 546, &group_id, "1"),
                colored(&p2pkh(WALLET), 546, &group_id, "1"),
                colored(&p2pkh(WALLET), 546, &group_id, "1"),
                colored(&p2pkh(WALLET), 546, &group_id, "7"),
                output(&p2pkh(WALLET), 8000),
            ],
        );
        tx.token_entries = vec![entry(&group_id, "SEND", "SLP", 0x81)];

        let parsed = classify(&tx, &wallet(), &no_tokens(), 2).unwrap();
        let entry = &parsed.token_entries[0];
        assert_eq!(entry.rendered_tx_type, RenderedTxType::FanOut);
        assert_eq!(entry.nft_fan_inputs_created, Some(3));
        assert_eq!(parsed.token_payload_error, None);
    }

    /// Classify an incoming payment carrying `op_return`.
    fn with_op_return(op_return: &str) -> ParsedTx {
        let tx = tx(
            &"c1".repeat(32),
            vec![input(&p2pkh(OTHER), 10000)],
            vec![output(op_return, 0), output(&p2pkh(WALLET), 9000)],
        );
        classify(&tx, &wallet(), &no_tokens(), 2).unwrap()
    }

    #[test]
    fn test_swap_names_its_token() {
        let script = format!("6a04535750000101010120{}", SEND_TOKEN_ID);
        let parsed = with_op_return(&script);
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Swap });
        assert_eq!(
            parsed.app_actions,
            vec![AppAction {
                lokad_id: "53575000".to_string(),
                app: "SWaP".to_string(),
                is_valid: None,
                action: Some(ActionData::Swap {
                    token_id: SEND_TOKEN_ID.to_string(),
                }),
            }]
        );

        // a non-SLP swap signal carries no token
        let parsed = with_op_return(&format!("6a04535750000102010120{}", SEND_TOKEN_ID));
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_ecashchat_message() {
        let parsed = with_op_return("6a04636861740568656c6c6f");
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::EcashChat });
        assert_eq!(parsed.app_actions[0].app, "eCashChat");
        assert_eq!(parsed.app_actions[0].is_valid, Some(true));
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::Message {
                msg: "hello".to_string()
            })
        );

        let parsed = with_op_return("6a0463686174");
        assert_eq!(parsed.protocol, ProtocolLabel::OffSpec { app: AppLokad::EcashChat });
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_paywall_payment() {
        let article = "ab".repeat(32);
        let parsed = with_op_return(&format!("6a047061797720{}", article));
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Paywall });
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::Paywall {
                shared_article_txid: article,
            })
        );

        let parsed = with_op_return("6a0470617977");
        assert_eq!(parsed.protocol, ProtocolLabel::OffSpec { app: AppLokad::Paywall });
    }

    #[test]
    fn test_auth() {
        let parsed = with_op_return(&format!("6a046175746814{}", OTHER));
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Auth });
        assert_eq!(parsed.app_actions[0].app, "Auth");
        assert_eq!(parsed.app_actions[0].is_valid, Some(true));
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_article_and_article_reply() {
        let parsed = with_op_return("6a04626c6f670568656c6c6f");
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Article });
        assert_eq!(parsed.app_actions[0].app, "eCashChat Article");
        assert_eq!(parsed.app_actions[0].is_valid, Some(true));

        let article = "cd".repeat(32);
        let parsed = with_op_return(&format!("6a04626c6f670472706c7920{}026869", article));
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::Article });
        assert_eq!(parsed.app_actions[0].app, "eCashChat Article Reply");
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::ArticleReply {
                reply_article_txid: article.clone(),
                msg: "hi".to_string(),
            })
        );

        // a reply without its message
        let parsed = with_op_return(&format!("6a04626c6f670472706c7920{}", article));
        assert_eq!(parsed.protocol, ProtocolLabel::OffSpec { app: AppLokad::Article });
        assert_eq!(parsed.app_actions[0].app, "eCashChat Article Reply");
        assert_eq!(parsed.app_actions[0].is_valid, Some(false));
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_cashtab_message() {
        let parsed = with_op_return("6a04007461620a68656c6c6f2074686572");
        assert_eq!(parsed.protocol, ProtocolLabel::App { app: AppLokad::CashtabMsg });
        assert_eq!(parsed.app_actions[0].lokad_id, "00746162");
        assert_eq!(parsed.app_actions[0].app, "Cashtab Msg");
        assert_eq!(
            parsed.app_actions[0].action,
            Some(ActionData::Message {
                msg: "hello ther".to_string()
            })
        );
    }

    #[test]
    fn test_cashtab_encrypted() {
        let parsed = with_op_return("6a046574616204deadbeef");
        assert_eq!(
            parsed.protocol,
            ProtocolLabel::App {
                app: AppLokad::CashtabEncrypted
            }
        );
        assert_eq!(parsed.app_actions[0].app, "Cashtab Encrypted");
        assert_eq!(parsed.app_actions[0].is_valid, None);
        assert_eq!(parsed.app_actions[0].action, None);
    }

    #[test]
    fn test_unknown_prefix() {
        let parsed = with_op_return("6a040102030402abcd");
        assert_eq!(parsed.protocol, ProtocolLabel::Unknown);
        assert_eq!(parsed.app_actions[0].lokad_id, "01020304");
        assert_eq!(parsed.app_actions[0].app, "unknown");
        assert_eq!(parsed.app_actions[0].is_valid, None);
        assert!(matches!(
            &parsed.app_actions[0].action,
            Some(ActionData::Stack { stack, .. }) if stack == "01020304 abcd"
        ));
        assert!(parsed.token_entries.is_empty());
    }
}
