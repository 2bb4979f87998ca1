use crate::error::{ScriptParseError, TokenPayloadError};

use super::alp::{is_alp_section, parse_alp_section};
use super::lokad::{AppLokad, SLP_LOKAD};
use super::script::{parse_script, stack_array, Op, OP_RESERVED, OP_RETURN};
use super::slp::parse_slp;
use super::token::TokenSection;

/// One push of an eMPP output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmppPush {
    Alp(Result<TokenSection, TokenPayloadError>),
    /// Non-ALP push, kept as its 4-byte prefix if it has one.
    Other(Vec<u8>),
}

/// Tagged view of an OP_RETURN output.
///
/// `stack` fields hold the stack array after OP_RETURN, so index 0 is the
/// LOKAD prefix for app protocols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpReturn {
    /// SLP v1. An invalid payload is kept as the error, the script itself
    /// was well formed.
    Slp(Result<TokenSection, TokenPayloadError>),
    /// eMPP (`OP_RETURN OP_RESERVED ...`) carrying ALP sections.
    Empp(Vec<EmppPush>),
    App { lokad: AppLokad, stack: Vec<Vec<u8>> },
    /// First push is not a 4-byte prefix: a plain text message from a
    /// wallet like ElectrumABC.
    External { stack: Vec<Vec<u8>> },
    Unknown { stack: Vec<Vec<u8>> },
}

impl OpReturn {
    pub fn kind(&self) -> &'static str {
        match self {
            OpReturn::Slp(_) => "slp",
            OpReturn::Empp(_) => "empp",
            OpReturn::App { lokad, .. } => lokad.as_str(),
            OpReturn::External { .. } => "external",
            OpReturn::Unknown { .. } => "unknown",
        }
    }

    /// Token sections that decoded cleanly, in output order.
    pub fn token_sections(&self) -> Vec<&TokenSection> {
        match self {
            OpReturn::Slp(Ok(section)) => vec![section],
            OpReturn::Empp(pushes) => pushes
                .iter()
                .filter_map(|push| match push {
                    EmppPush::Alp(Ok(section)) => Some(section),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Decode a locking script as an OP_RETURN output.
///
/// Returns `Ok(None)` for scripts that do not start with OP_RETURN. Scripts
/// that are not walkable yield a `ScriptParseError`. Unrecognised payloads
/// are `OpReturn::Unknown`, never an error.
pub fn decode_op_return(script_hex: &str) -> Result<Option<OpReturn>, ScriptParseError> {
    let bytes = hex::decode(script_hex)
        .map_err(|e| ScriptParseError::InvalidHex(format!("{}: {}", script_hex, e)))?;
    if bytes.first() != Some(&OP_RETURN) {
        return Ok(None);
    }

    let ops = parse_script(&bytes)?;
    let payload = &ops[1..];

    if payload.first() == Some(&Op::Code(OP_RESERVED)) {
        return Ok(Some(OpReturn::Empp(decode_empp(&payload[1..]))));
    }

    let stack = stack_array(payload);
    let Some(prefix) = stack.first() else {
        return Ok(Some(OpReturn::Unknown { stack }));
    };

    if prefix.len() != 4 {
        return Ok(Some(OpReturn::External { stack }));
    }
    if prefix.as_slice() == SLP_LOKAD {
        return Ok(Some(OpReturn::Slp(parse_slp(payload))));
    }

    Ok(Some(match AppLokad::from_prefix(prefix) {
        Some(lokad) => OpReturn::App { lokad, stack },
        None => OpReturn::Unknown { stack },
    }))
}

fn decode_empp(ops: &[Op]) -> Vec<EmppPush> {
    ops.iter()
        .map(|op| match op {
            Op::Push { data, .. } if is_alp_section(data) => {
                EmppPush::Alp(parse_alp_section(data))
            }
            Op::Push { data, .. } => EmppPush::Other(data.iter().take(4).copied().collect()),
            Op::Code(code) => EmppPush::Other(vec![*code]),
        })
        .collect()
}
