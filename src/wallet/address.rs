use serde::Serialize;

use crate::error::CashAddressError;

pub const ECASH_PREFIX: &str = "ecash";

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";
const CHECKSUM_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    P2pkh,
    P2sh,
}

impl AddressType {
    pub fn version_byte(&self) -> u8 {
        match self {
            AddressType::P2pkh => 0x00,
            AddressType::P2sh => 0x08,
        }
    }

    pub fn from_version_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(AddressType::P2pkh),
            0x08 => Some(AddressType::P2sh),
            _ => None,
        }
    }
}

/// Hash160 (hex) of a p2pkh `76a914{hash}88ac` or p2sh `a914{hash}87`
/// locking script. Anything else has no wallet-matchable hash.
pub fn script_hash(script_hex: &str) -> Option<(AddressType, &str)> {
    let script = script_hex.as_bytes();
    if script.len() == 50 && script_hex.starts_with("76a914") && script_hex.ends_with("88ac") {
        return Some((AddressType::P2pkh, &script_hex[6..46]));
    }
    if script.len() == 46 && script_hex.starts_with("a914") && script_hex.ends_with("87") {
        return Some((AddressType::P2sh, &script_hex[4..44]));
    }
    None
}

/// Cashaddr for a locking script, if it is p2pkh or p2sh.
pub fn script_to_address(script_hex: &str) -> Option<String> {
    let (addr_type, hash) = script_hash(script_hex)?;
    let hash = hex::decode(hash).ok()?;
    Some(encode_cash_address(ECASH_PREFIX, addr_type, &hash))
}

pub fn encode_cash_address(prefix: &str, addr_type: AddressType, hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(hash.len() + 1);
    payload.push(addr_type.version_byte());
    payload.extend_from_slice(hash);
    encode_payload(prefix, &payload)
}

/// Encode a raw `version byte || hash` payload.
pub fn encode_payload(prefix: &str, payload: &[u8]) -> String {
    let data = convert_bits(payload, 8, 5, true).unwrap_or_default();
    let checksum = checksum(prefix, &data);
    let body: String = data
        .iter()
        .chain(checksum.iter())
        .map(|x| CHARSET[*x as usize] as char)
        .collect();
    format!("{}:{}", prefix, body)
}

/// Decode a prefixed cashaddr into its type and 20-byte hash.
pub fn decode_cash_address(address: &str) -> Result<(AddressType, [u8; 20]), CashAddressError> {
    let address = address.to_ascii_lowercase();
    let (prefix, body) = address
        .split_once(':')
        .ok_or(CashAddressError::MissingPrefix)?;

    let data = body
        .chars()
        .enumerate()
        .map(|(i, c)| {
            CHARSET
                .iter()
                .position(|x| *x as char == c)
                .map(|x| x as u8)
                .ok_or(CashAddressError::InvalidBase32Char(i, c))
        })
        .collect::<Result<Vec<u8>, _>>()?;

    if data.len() <= CHECKSUM_LEN
        || poly_mod(prefix_values(prefix).chain(data.iter().copied())) != 0
    {
        return Err(CashAddressError::InvalidChecksum);
    }

    let payload = convert_bits(&data[..data.len() - CHECKSUM_LEN], 5, 8, false)
        .ok_or(CashAddressError::InvalidPayloadLength(0))?;
    let (version, hash) = payload
        .split_first()
        .ok_or(CashAddressError::InvalidPayloadLength(0))?;
    let hash: [u8; 20] = hash
        .try_into()
        .map_err(|_| CashAddressError::InvalidPayloadLength(hash.len()))?;
    let addr_type = AddressType::from_version_byte(*version)
        .ok_or(CashAddressError::InvalidAddressType(*version))?;

    Ok((addr_type, hash))
}

fn prefix_values(prefix: &str) -> impl Iterator<Item = u8> + '_ {
    prefix.bytes().map(|b| b & 0x1f).chain(std::iter::once(0))
}

fn checksum(prefix: &str, data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let poly = poly_mod(
        prefix_values(prefix)
            .chain(data.iter().copied())
            .chain([0u8; CHECKSUM_LEN]),
    );
    let mut out = [0u8; CHECKSUM_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = ((poly >> (5 * (7 - i))) & 0x1f) as u8;
    }
    out
}

fn poly_mod(values: impl Iterator<Item = u8>) -> u64 {
    const GENERATORS: [u64; 5] = [
        0x98_f2bc_8e61,
        0x79_b76d_99e2,
        0xf3_3e5f_b3c4,
        0xae_2eab_e2a8,
        0x1e_4f43_e470,
    ];
    let mut c: u64 = 1;
    for value in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x07_ffff_ffff) << 5) ^ value as u64;
        for (bit, generator) in GENERATORS.iter().enumerate() {
            if c0 & (1 << bit) != 0 {
                c ^= generator;
            }
        }
    }
    c ^ 1
}

fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let max_value = (1u32 << to) - 1;
    let max_acc = (1u32 << (from + to - 1)) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);
    for value in data {
        let value = *value as u32;
        if value >> from != 0 {
            return None;
        }
        acc = ((acc << from) | value) & max_acc;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & max_value) as u8);
        }
    }
    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & max_value) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & max_value) != 0 {
        return None;
    }
    Some(out)
}
