use thiserror::Error;

/// A script that cannot be walked opcode by opcode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptParseError {
    #[error("script is not valid hex: {0}")]
    InvalidHex(String),

    #[error("push at offset {offset} needs {needed} bytes, only {available} left")]
    TruncatedPush {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("OP_PUSHDATA at offset {offset} is missing its length prefix")]
    MissingLengthPrefix { offset: usize },
}

/// A well-formed OP_RETURN whose token payload breaks the protocol rules or
/// that the indexer did not accept. Not fatal: the tx is still classified,
/// just without that token section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenPayloadError {
    #[error("payload ended early while reading {0}")]
    UnexpectedEnd(&'static str),

    #[error("unexpected non-push opcode 0x{0:02x} in token payload")]
    NonPushOpcode(u8),

    #[error("unknown token tx type '{0}'")]
    UnknownTxType(String),

    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    #[error("{0} trailing bytes after token section")]
    TrailingBytes(usize),

    #[error("{tx_type} of token {token_id} was not validated by the indexer")]
    Unvalidated {
        token_id: String,
        tx_type: &'static str,
    },

    #[error("indexer marked {tx_type} of token {token_id} invalid")]
    RejectedByIndexer { token_id: String, tx_type: String },
}

/// Token metadata and amount errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("no genesis info cached for token {0}")]
    NotFound(String),

    #[error("invalid token amount '{0}'")]
    InvalidAmount(String),

    #[error("token decimals must be 0-9, got {0}")]
    DecimalsOutOfRange(u32),

    #[error("amount '{amount}' has more than {decimals} decimal places")]
    TooManyDecimalPlaces { amount: String, decimals: u32 },

    #[error("token source failed for {token_id}: {reason}")]
    Source { token_id: String, reason: String },
}

/// Failure to classify a single transaction. Never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("tx {txid}: {source}")]
    Script {
        txid: String,
        #[source]
        source: ScriptParseError,
    },
}

/// A cashaddr string that does not decode to a p2pkh/p2sh hash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CashAddressError {
    #[error("address has no prefix")]
    MissingPrefix,

    #[error("invalid base32 character '{1}' at position {0}")]
    InvalidBase32Char(usize, char),

    #[error("payload decodes to {0} hash bytes, expected 20")]
    InvalidPayloadLength(usize),

    #[error("unsupported address type byte {0}")]
    InvalidAddressType(u8),

    #[error("checksum mismatch")]
    InvalidChecksum,
}
