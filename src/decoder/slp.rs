use crate::chronik::TokenGenesisInfo;
use crate::error::TokenPayloadError;

use super::lokad::SLP_LOKAD;
use super::script::Op;
use super::token::{
    sequential_outputs, token_id_hex, TokenProtocol, TokenSection, TokenTxType,
    MAX_TOKEN_DECIMALS,
};

/// SEND may color at most this many outputs.
const MAX_SEND_OUTPUTS: usize = 19;

/// Parse an SLP v1 payload. `ops` are the elements after OP_RETURN,
/// starting with the `SLP\0` push.
pub fn parse_slp(ops: &[Op]) -> Result<TokenSection, TokenPayloadError> {
    let pushes = ops
        .iter()
        .map(|op| match op {
            Op::Push { data, .. } => Ok(data.as_slice()),
            Op::Code(code) => Err(TokenPayloadError::NonPushOpcode(*code)),
        })
        .collect::<Result<Vec<&[u8]>, _>>()?;

    if pushes.len() < 3 || pushes[0] != SLP_LOKAD {
        return Err(TokenPayloadError::UnexpectedEnd("SLP header"));
    }

    let token_type = parse_token_type(pushes[1])?;
    let tx_type = TokenTxType::from_bytes(pushes[2]).ok_or_else(|| {
        TokenPayloadError::UnknownTxType(String::from_utf8_lossy(pushes[2]).into_owned())
    })?;

    let fields = &pushes[3..];
    match tx_type {
        TokenTxType::Genesis => parse_genesis(token_type, fields),
        TokenTxType::Mint => parse_mint(token_type, fields),
        TokenTxType::Send => parse_send(token_type, fields),
        TokenTxType::Burn => Err(TokenPayloadError::UnknownTxType("BURN".to_string())),
    }
}

fn parse_token_type(bytes: &[u8]) -> Result<u8, TokenPayloadError> {
    match bytes {
        [t] if *t != 0 => Ok(*t),
        [0, t] if *t != 0 => Ok(*t),
        _ => Err(TokenPayloadError::InvalidField {
            field: "token_type",
            reason: format!("unsupported encoding {}", hex::encode(bytes)),
        }),
    }
}

fn parse_genesis(token_type: u8, fields: &[&[u8]]) -> Result<TokenSection, TokenPayloadError> {
    let [ticker, name, url, hash, decimals, baton, quantity] = fields else {
        return Err(TokenPayloadError::InvalidField {
            field: "GENESIS",
            reason: format!("expected 7 fields, got {}", fields.len()),
        });
    };

    if !hash.is_empty() && hash.len() != 32 {
        return Err(TokenPayloadError::InvalidField {
            field: "document_hash",
            reason: format!("must be 0 or 32 bytes, got {}", hash.len()),
        });
    }
    let decimals = match decimals {
        [d] if *d <= MAX_TOKEN_DECIMALS => *d,
        _ => {
            return Err(TokenPayloadError::InvalidField {
                field: "decimals",
                reason: hex::encode(decimals),
            })
        }
    };
    let mint_baton_outputs = parse_baton_vout(baton)?;
    let amount = parse_amount(quantity)?;

    Ok(TokenSection {
        protocol: TokenProtocol::Slp,
        token_type,
        tx_type: TokenTxType::Genesis,
        token_id: None,
        genesis_info: Some(TokenGenesisInfo {
            token_ticker: String::from_utf8_lossy(ticker).into_owned(),
            token_name: String::from_utf8_lossy(name).into_owned(),
            token_document_url: String::from_utf8_lossy(url).into_owned(),
            token_document_hash: hex::encode(hash),
            decimals,
        }),
        output_amounts: sequential_outputs(&[amount]),
        mint_baton_outputs,
        burn_amount: None,
    })
}

fn parse_mint(token_type: u8, fields: &[&[u8]]) -> Result<TokenSection, TokenPayloadError> {
    let [token_id, baton, quantity] = fields else {
        return Err(TokenPayloadError::InvalidField {
            field: "MINT",
            reason: format!("expected 3 fields, got {}", fields.len()),
        });
    };
    let token_id = parse_token_id(token_id)?;
    let mint_baton_outputs = parse_baton_vout(baton)?;
    let amount = parse_amount(quantity)?;

    Ok(TokenSection {
        protocol: TokenProtocol::Slp,
        token_type,
        tx_type: TokenTxType::Mint,
        token_id: Some(token_id),
        genesis_info: None,
        output_amounts: sequential_outputs(&[amount]),
        mint_baton_outputs,
        burn_amount: None,
    })
}

fn parse_send(token_type: u8, fields: &[&[u8]]) -> Result<TokenSection, TokenPayloadError> {
    let Some((token_id, amounts)) = fields.split_first() else {
        return Err(TokenPayloadError::UnexpectedEnd("SEND token id"));
    };
    if amounts.is_empty() || amounts.len() > MAX_SEND_OUTPUTS {
        return Err(TokenPayloadError::InvalidField {
            field: "SEND",
            reason: format!("1 to {} amounts allowed, got {}", MAX_SEND_OUTPUTS, amounts.len()),
        });
    }
    let token_id = parse_token_id(token_id)?;
    let amounts = amounts
        .iter()
        .map(|a| parse_amount(a))
        .collect::<Result<Vec<u64>, _>>()?;

    Ok(TokenSection {
        protocol: TokenProtocol::Slp,
        token_type,
        tx_type: TokenTxType::Send,
        token_id: Some(token_id),
        genesis_info: None,
        output_amounts: sequential_outputs(&amounts),
        mint_baton_outputs: Vec::new(),
        burn_amount: None,
    })
}

fn parse_token_id(bytes: &[u8]) -> Result<String, TokenPayloadError> {
    if bytes.len() != 32 {
        return Err(TokenPayloadError::InvalidField {
            field: "token_id",
            reason: format!("must be 32 bytes, got {}", bytes.len()),
        });
    }
    Ok(token_id_hex(bytes, false))
}

/// Empty push means no baton. Vouts 0 and 1 are reserved.
fn parse_baton_vout(bytes: &[u8]) -> Result<Vec<u32>, TokenPayloadError> {
    match bytes {
        [] => Ok(Vec::new()),
        [vout] if *vout >= 2 => Ok(vec![*vout as u32]),
        _ => Err(TokenPayloadError::InvalidField {
            field: "mint_baton_vout",
            reason: hex::encode(bytes),
        }),
    }
}

/// SLP amounts are 8-byte big-endian.
fn parse_amount(bytes: &[u8]) -> Result<u64, TokenPayloadError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| TokenPayloadError::InvalidField {
            field: "amount",
            reason: format!("must be 8 bytes, got {}", bytes.len()),
        })?;
    Ok(u64::from_be_bytes(arr))
}
