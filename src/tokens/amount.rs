use std::str::FromStr;

use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::BigDecimal;

use crate::decoder::token::MAX_TOKEN_DECIMALS;
use crate::error::TokenError;

/// Parse a raw (undecimalized) token or satoshi amount.
pub fn parse_raw(raw: &str) -> Result<BigInt, TokenError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TokenError::InvalidAmount(raw.to_string()));
    }
    BigInt::from_str(raw).map_err(|_| TokenError::InvalidAmount(raw.to_string()))
}

fn check_decimals(decimals: u8) -> Result<(), TokenError> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(TokenError::DecimalsOutOfRange(decimals as u32));
    }
    Ok(())
}

/// Render a raw integer amount in human units with exactly `decimals`
/// fractional digits: `scale_amount("20999996944", 3) == "20999996.944"`.
pub fn scale_amount(raw: &str, decimals: u8) -> Result<String, TokenError> {
    check_decimals(decimals)?;
    let value = parse_raw(raw)?;
    Ok(render_scaled(&value, decimals))
}

/// Same as [`scale_amount`] for an already parsed integer. Negative values
/// keep their sign.
pub fn render_scaled(value: &BigInt, decimals: u8) -> String {
    let digits = value.magnitude().to_str_radix(10);
    let sign = if value.sign() == Sign::Minus { "-" } else { "" };
    let decimals = decimals as usize;
    if decimals == 0 {
        return format!("{}{}", sign, digits);
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    format!("{}{}.{}", sign, whole, frac)
}

/// Inverse of [`scale_amount`]: the raw integer string for a human amount.
pub fn unscale_amount(human: &str, decimals: u8) -> Result<String, TokenError> {
    check_decimals(decimals)?;
    let value =
        BigDecimal::from_str(human).map_err(|_| TokenError::InvalidAmount(human.to_string()))?;
    if value.sign() == Sign::Minus {
        return Err(TokenError::InvalidAmount(human.to_string()));
    }
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    if scale > decimals as i64 {
        return Err(TokenError::TooManyDecimalPlaces {
            amount: human.to_string(),
            decimals: decimals as u32,
        });
    }
    let (raw, _) = value.with_scale(decimals as i64).into_bigint_and_exponent();
    Ok(raw.to_str_radix(10))
}
