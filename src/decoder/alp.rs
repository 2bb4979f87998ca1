use crate::chronik::TokenGenesisInfo;
use crate::error::TokenPayloadError;

use super::lokad::ALP_LOKAD;
use super::token::{
    sequential_outputs, token_id_hex, TokenProtocol, TokenSection, TokenTxType,
    MAX_TOKEN_DECIMALS,
};

/// Amount and baton counts are a single byte capped at this value.
const MAX_ALP_COUNT: u8 = 127;

/// Cursor over one ALP section.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], TokenPayloadError> {
        if self.data.len() - self.pos < n {
            return Err(TokenPayloadError::UnexpectedEnd(what));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, TokenPayloadError> {
        Ok(self.take(1, what)?[0])
    }

    /// Bitcoin CompactSize.
    fn size(&mut self, what: &'static str) -> Result<usize, TokenPayloadError> {
        let first = self.u8(what)?;
        let width = match first {
            0xfd => 2,
            0xfe => 4,
            0xff => 8,
            n => return Ok(n as usize),
        };
        let bytes = self.take(width, what)?;
        let value = bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64);
        usize::try_from(value).map_err(|_| TokenPayloadError::InvalidField {
            field: what,
            reason: format!("size {} too large", value),
        })
    }

    fn count(&mut self, what: &'static str) -> Result<usize, TokenPayloadError> {
        let n = self.u8(what)?;
        if n > MAX_ALP_COUNT {
            return Err(TokenPayloadError::InvalidField {
                field: what,
                reason: format!("{} is above {}", n, MAX_ALP_COUNT),
            });
        }
        Ok(n as usize)
    }

    fn var_bytes(&mut self, what: &'static str) -> Result<&'a [u8], TokenPayloadError> {
        let len = self.size(what)?;
        self.take(len, what)
    }

    /// ALP amounts are 6-byte little-endian.
    fn amount(&mut self) -> Result<u64, TokenPayloadError> {
        let bytes = self.take(6, "amount")?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    fn amounts(&mut self) -> Result<Vec<u64>, TokenPayloadError> {
        let count = self.count("amount count")?;
        (0..count).map(|_| self.amount()).collect()
    }

    fn token_id(&mut self) -> Result<String, TokenPayloadError> {
        Ok(token_id_hex(self.take(32, "token_id")?, true))
    }

    fn finish(self) -> Result<(), TokenPayloadError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(TokenPayloadError::TrailingBytes(n)),
        }
    }
}

/// Whether an eMPP push is an ALP section.
pub fn is_alp_section(push: &[u8]) -> bool {
    push.starts_with(&ALP_LOKAD)
}

/// Parse one ALP section (an eMPP push starting with `SLP2`).
pub fn parse_alp_section(push: &[u8]) -> Result<TokenSection, TokenPayloadError> {
    let mut r = Reader::new(push);
    if r.take(4, "lokad")? != ALP_LOKAD {
        return Err(TokenPayloadError::InvalidField {
            field: "lokad",
            reason: hex::encode(&push[..4]),
        });
    }
    let token_type = r.u8("token_type")?;
    let tx_type_bytes = r.var_bytes("tx_type")?;
    let tx_type = TokenTxType::from_bytes(tx_type_bytes).ok_or_else(|| {
        TokenPayloadError::UnknownTxType(String::from_utf8_lossy(tx_type_bytes).into_owned())
    })?;

    let section = match tx_type {
        TokenTxType::Genesis => {
            let ticker = r.var_bytes("ticker")?;
            let name = r.var_bytes("name")?;
            let url = r.var_bytes("url")?;
            let _data = r.var_bytes("data")?;
            let _auth_pubkey = r.var_bytes("auth_pubkey")?;
            let decimals = r.u8("decimals")?;
            if decimals > MAX_TOKEN_DECIMALS {
                return Err(TokenPayloadError::InvalidField {
                    field: "decimals",
                    reason: decimals.to_string(),
                });
            }
            let amounts = r.amounts()?;
            let num_batons = r.count("baton count")?;
            TokenSection {
                protocol: TokenProtocol::Alp,
                token_type,
                tx_type,
                token_id: None,
                genesis_info: Some(TokenGenesisInfo {
                    token_ticker: String::from_utf8_lossy(ticker).into_owned(),
                    token_name: String::from_utf8_lossy(name).into_owned(),
                    token_document_url: String::from_utf8_lossy(url).into_owned(),
                    token_document_hash: String::new(),
                    decimals,
                }),
                mint_baton_outputs: baton_outputs(amounts.len(), num_batons),
                output_amounts: sequential_outputs(&amounts),
                burn_amount: None,
            }
        }
        TokenTxType::Mint => {
            let token_id = r.token_id()?;
            let amounts = r.amounts()?;
            let num_batons = r.count("baton count")?;
            TokenSection {
                protocol: TokenProtocol::Alp,
                token_type,
                tx_type,
                token_id: Some(token_id),
                genesis_info: None,
                mint_baton_outputs: baton_outputs(amounts.len(), num_batons),
                output_amounts: sequential_outputs(&amounts),
                burn_amount: None,
            }
        }
        TokenTxType::Send => {
            let token_id = r.token_id()?;
            let amounts = r.amounts()?;
            TokenSection {
                protocol: TokenProtocol::Alp,
                token_type,
                tx_type,
                token_id: Some(token_id),
                genesis_info: None,
                output_amounts: sequential_outputs(&amounts),
                mint_baton_outputs: Vec::new(),
                burn_amount: None,
            }
        }
        TokenTxType::Burn => {
            let token_id = r.token_id()?;
            let amount = r.amount()?;
            TokenSection {
                protocol: TokenProtocol::Alp,
                token_type,
                tx_type,
                token_id: Some(token_id),
                genesis_info: None,
                output_amounts: Vec::new(),
                mint_baton_outputs: Vec::new(),
                burn_amount: Some(amount),
            }
        }
    };

    r.finish()?;
    Ok(section)
}

/// Batons sit right after the amount outputs.
fn baton_outputs(num_amounts: usize, num_batons: usize) -> Vec<u32> {
    (0..num_batons)
        .map(|i| (num_amounts + i + 1) as u32)
        .collect()
}
