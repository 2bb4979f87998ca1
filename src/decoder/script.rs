use crate::error::ScriptParseError;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_RESERVED: u8 = 0x50;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;

/// A single decoded script element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Data push. `opcode` is the byte that introduced it.
    Push { opcode: u8, data: Vec<u8> },
    /// Any non-push opcode.
    Code(u8),
}

impl Op {
    /// Bytes this element contributes to a stack array.
    ///
    /// Small-number opcodes are rendered as the number they push, so
    /// `OP_0` reads as `00` and `OP_1` as `01`.
    pub fn stack_bytes(&self) -> Vec<u8> {
        match self {
            Op::Push { opcode, data } => match *opcode {
                OP_0 => vec![0x00],
                OP_1NEGATE => vec![0x81],
                op @ OP_1..=OP_16 => vec![op - OP_1 + 1],
                _ => data.clone(),
            },
            Op::Code(op) => vec![*op],
        }
    }

    /// Raw pushed data, without small-number rendering.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Op::Push { data, .. } => Some(data),
            Op::Code(_) => None,
        }
    }
}

/// Decode a hex script into opcodes.
pub fn parse_script_hex(script_hex: &str) -> Result<Vec<Op>, ScriptParseError> {
    let bytes = hex::decode(script_hex)
        .map_err(|e| ScriptParseError::InvalidHex(format!("{}: {}", script_hex, e)))?;
    parse_script(&bytes)
}

/// Walk a script sequentially. Fails on truncated pushes or missing
/// OP_PUSHDATA length prefixes.
pub fn parse_script(bytes: &[u8]) -> Result<Vec<Op>, ScriptParseError> {
    let mut ops = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let opcode = bytes[pos];
        let opcode_offset = pos;
        pos += 1;

        let push_len = match opcode {
            OP_0 => Some(0),
            0x01..=0x4b => Some(opcode as usize),
            OP_PUSHDATA1 => Some(read_len(bytes, &mut pos, 1, opcode_offset)?),
            OP_PUSHDATA2 => Some(read_len(bytes, &mut pos, 2, opcode_offset)?),
            OP_PUSHDATA4 => Some(read_len(bytes, &mut pos, 4, opcode_offset)?),
            OP_1NEGATE | OP_1..=OP_16 => Some(0),
            _ => None,
        };

        match push_len {
            Some(len) => {
                let available = bytes.len() - pos;
                if len > available {
                    return Err(ScriptParseError::TruncatedPush {
                        offset: opcode_offset,
                        needed: len,
                        available,
                    });
                }
                ops.push(Op::Push {
                    opcode,
                    data: bytes[pos..pos + len].to_vec(),
                });
                pos += len;
            }
            None => ops.push(Op::Code(opcode)),
        }
    }

    Ok(ops)
}

/// Little-endian length prefix of OP_PUSHDATA1/2/4.
fn read_len(
    bytes: &[u8],
    pos: &mut usize,
    width: usize,
    opcode_offset: usize,
) -> Result<usize, ScriptParseError> {
    if bytes.len() < *pos + width {
        return Err(ScriptParseError::MissingLengthPrefix {
            offset: opcode_offset,
        });
    }
    let len = bytes[*pos..*pos + width]
        .iter()
        .rev()
        .fold(0usize, |acc, b| (acc << 8) | *b as usize);
    *pos += width;
    Ok(len)
}

/// Stack array view of a script: one entry per element, empty pushes
/// dropped (some wallets emit a stray `4c00`).
pub fn stack_array(ops: &[Op]) -> Vec<Vec<u8>> {
    ops.iter()
        .map(Op::stack_bytes)
        .filter(|bytes| !bytes.is_empty())
        .collect()
}
