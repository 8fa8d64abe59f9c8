// src/asset.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TokenError;

/// Largest magnitude an [`Asset`] amount may hold: 2^62 - 1.
pub const MAX_AMOUNT: i64 = (1 << 62) - 1;

/// Highest decimal precision a [`Symbol`] may carry.
pub const MAX_PRECISION: u8 = 18;

/// Ticker of a token: one to seven upper-case letters packed into a `u64`,
/// first letter in the lowest byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolCode(u64);

impl SymbolCode {
    pub const MAX_LEN: usize = 7;

    pub fn new(code: &str) -> Result<Self, TokenError> {
        if code.is_empty() || code.len() > Self::MAX_LEN {
            return Err(TokenError::validation(format!(
                "symbol code must be 1 to {} characters: {:?}",
                Self::MAX_LEN,
                code
            )));
        }

        let mut raw = 0u64;
        for (i, b) in code.bytes().enumerate() {
            if !b.is_ascii_uppercase() {
                return Err(TokenError::validation(format!(
                    "symbol code must be upper-case A-Z: {:?}",
                    code
                )));
            }
            raw |= (b as u64) << (8 * i);
        }

        Ok(Self(raw))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Letters must be contiguous from the lowest byte, with nothing but
    /// zero bytes after the last one.
    pub fn is_valid(&self) -> bool {
        if self.0 >> (8 * Self::MAX_LEN) != 0 {
            return false;
        }

        let mut rest = self.0;
        let mut len = 0;
        while rest & 0xff != 0 {
            if !(rest as u8).is_ascii_uppercase() {
                return false;
            }
            rest >>= 8;
            len += 1;
        }

        len > 0 && rest == 0
    }

    pub fn len(&self) -> usize {
        self.bytes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    fn bytes(&self) -> impl Iterator<Item = u8> {
        let raw = self.0;
        (0..8)
            .map(move |i| (raw >> (8 * i)) as u8)
            .take_while(|b| *b != 0)
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.bytes() {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl FromStr for SymbolCode {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// A token type: ticker plus the number of decimal places of its amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    code: SymbolCode,
    precision: u8,
}

impl Symbol {
    pub fn new(code: &str, precision: u8) -> Result<Self, TokenError> {
        let symbol = Self {
            code: SymbolCode::new(code)?,
            precision,
        };
        if precision > MAX_PRECISION {
            return Err(TokenError::validation(format!(
                "precision {} exceeds {}",
                precision, MAX_PRECISION
            )));
        }
        Ok(symbol)
    }

    pub const fn from_parts(code: SymbolCode, precision: u8) -> Self {
        Self { code, precision }
    }

    /// `code << 8 | precision`
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            code: SymbolCode::from_raw(raw >> 8),
            precision: raw as u8,
        }
    }

    pub const fn raw(&self) -> u64 {
        self.code.raw() << 8 | self.precision as u64
    }

    pub const fn code(&self) -> SymbolCode {
        self.code
    }

    pub const fn precision(&self) -> u8 {
        self.precision
    }

    pub fn is_valid(&self) -> bool {
        self.precision <= MAX_PRECISION && self.code.is_valid()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for Symbol {
    type Err = TokenError;

    /// Parses `"<precision>,<CODE>"`, e.g. `"4,XYZ"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| TokenError::validation(format!("malformed symbol: {:?}", s)))?;
        let precision = precision
            .trim()
            .parse::<u8>()
            .map_err(|_| TokenError::validation(format!("malformed precision: {:?}", s)))?;
        Self::new(code.trim(), precision)
    }
}

/// A fixed-point quantity of one token type.
///
/// Arithmetic never wraps: results outside `[-MAX_AMOUNT, MAX_AMOUNT]` are
/// rejected, and assets of different symbols cannot be combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }

    pub const fn zero(symbol: Symbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_amount_within_range(&self) -> bool {
        (-MAX_AMOUNT..=MAX_AMOUNT).contains(&self.amount)
    }

    pub fn is_valid(&self) -> bool {
        self.is_amount_within_range() && self.symbol.is_valid()
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, TokenError> {
        self.ensure_same_symbol(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .filter(|a| *a <= MAX_AMOUNT)
            .ok_or_else(|| TokenError::invariant(format!("addition overflow: {} + {}", self, other)))?;
        if amount < -MAX_AMOUNT {
            return Err(TokenError::invariant(format!(
                "addition underflow: {} + {}",
                self, other
            )));
        }
        Ok(Asset::new(amount, self.symbol))
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, TokenError> {
        self.ensure_same_symbol(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .filter(|a| *a >= -MAX_AMOUNT)
            .ok_or_else(|| {
                TokenError::invariant(format!("subtraction underflow: {} - {}", self, other))
            })?;
        if amount > MAX_AMOUNT {
            return Err(TokenError::invariant(format!(
                "subtraction overflow: {} - {}",
                self, other
            )));
        }
        Ok(Asset::new(amount, self.symbol))
    }

    fn ensure_same_symbol(&self, other: &Asset) -> Result<(), TokenError> {
        if self.symbol != other.symbol {
            return Err(TokenError::validation(format!(
                "cannot combine assets of different symbols: {} and {}",
                self.symbol, other.symbol
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let magnitude = self.amount.unsigned_abs();
        let precision = self.symbol.precision() as u32;

        match 10u64.checked_pow(precision) {
            Some(scale) if precision > 0 => write!(
                f,
                "{}{}.{:0width$} {}",
                sign,
                magnitude / scale,
                magnitude % scale,
                self.symbol.code(),
                width = precision as usize
            ),
            _ => write!(f, "{}{} {}", sign, magnitude, self.symbol.code()),
        }
    }
}

impl FromStr for Asset {
    type Err = TokenError;

    /// Parses `"1000.00 XYZ"`; the number of decimals sets the precision.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TokenError::validation(format!("malformed asset: {:?}", s));

        let (number, code) = s.trim().split_once(' ').ok_or_else(malformed)?;
        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

        if int_part.is_empty() || digits.ends_with('.') {
            return Err(malformed());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let precision = u8::try_from(frac_part.len()).map_err(|_| malformed())?;
        let symbol = Symbol::new(code.trim(), precision)?;

        let mut amount: i64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            amount = amount
                .checked_mul(10)
                .and_then(|a| a.checked_add((b - b'0') as i64))
                .ok_or_else(|| TokenError::invariant(format!("amount out of range: {:?}", s)))?;
        }
        if amount > MAX_AMOUNT {
            return Err(TokenError::invariant(format!("amount out of range: {:?}", s)));
        }

        Ok(Asset::new(if negative { -amount } else { amount }, symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_code_packing() {
        let code = SymbolCode::new("XYZ").unwrap();
        assert_eq!(code.raw(), b'X' as u64 | (b'Y' as u64) << 8 | (b'Z' as u64) << 16);
        assert_eq!(code.to_string(), "XYZ");
        assert_eq!(code.len(), 3);
        assert!(code.is_valid());
    }

    #[test]
    fn test_symbol_code_rejects_bad_input() {
        assert!(SymbolCode::new("").is_err());
        assert!(SymbolCode::new("ABCDEFGH").is_err());
        assert!(SymbolCode::new("xyz").is_err());
        assert!(SymbolCode::new("X1").is_err());

        // gap between letters
        let gapped = SymbolCode::from_raw(b'A' as u64 | (b'B' as u64) << 16);
        assert!(!gapped.is_valid());
        assert!(!SymbolCode::from_raw(0).is_valid());
    }

    #[test]
    fn test_symbol_parse_and_raw() {
        let sym: Symbol = "2,XYZ".parse().unwrap();
        assert_eq!(sym.precision(), 2);
        assert_eq!(sym.code().to_string(), "XYZ");
        assert_eq!(Symbol::from_raw(sym.raw()), sym);
        assert_eq!(sym.to_string(), "2,XYZ");

        assert!("19,XYZ".parse::<Symbol>().is_err());
        assert_ne!(Symbol::new("XYZ", 2).unwrap(), Symbol::new("XYZ", 4).unwrap());
    }

    #[test]
    fn test_asset_parse_and_display() {
        let a: Asset = "1000.00 XYZ".parse().unwrap();
        assert_eq!(a.amount, 100_000);
        assert_eq!(a.symbol, Symbol::new("XYZ", 2).unwrap());
        assert_eq!(a.to_string(), "1000.00 XYZ");

        let b: Asset = "-0.05 XYZ".parse().unwrap();
        assert_eq!(b.amount, -5);
        assert_eq!(b.to_string(), "-0.05 XYZ");

        let whole: Asset = "42 ABC".parse().unwrap();
        assert_eq!(whole.symbol.precision(), 0);
        assert_eq!(whole.to_string(), "42 ABC");

        assert!("1.0.0 XYZ".parse::<Asset>().is_err());
        assert!("12. XYZ".parse::<Asset>().is_err());
        assert!("12XYZ".parse::<Asset>().is_err());
        assert!("99999999999999999999 XYZ".parse::<Asset>().is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let sym = Symbol::new("XYZ", 2).unwrap();
        let a = Asset::new(150, sym);
        let b = Asset::new(50, sym);

        assert_eq!(a.checked_add(&b).unwrap().amount, 200);
        assert_eq!(b.checked_sub(&a).unwrap().amount, -100);

        let max = Asset::new(MAX_AMOUNT, sym);
        let err = max.checked_add(&Asset::new(1, sym)).unwrap_err();
        assert!(matches!(err, TokenError::InvariantViolation(_)));

        let min = Asset::new(-MAX_AMOUNT, sym);
        let err = min.checked_sub(&Asset::new(1, sym)).unwrap_err();
        assert!(matches!(err, TokenError::InvariantViolation(_)));
    }

    #[test]
    fn test_mismatched_symbols_do_not_combine() {
        let a = Asset::new(1, Symbol::new("XYZ", 2).unwrap());
        let b = Asset::new(1, Symbol::new("XYZ", 4).unwrap());
        assert!(matches!(a.checked_add(&b), Err(TokenError::Validation(_))));
        assert!(matches!(a.checked_sub(&b), Err(TokenError::Validation(_))));
    }

    #[test]
    fn test_validity() {
        let sym = Symbol::new("XYZ", 2).unwrap();
        assert!(Asset::new(MAX_AMOUNT, sym).is_valid());
        assert!(!Asset::new(MAX_AMOUNT + 1, sym).is_valid());
        assert!(!Asset::new(i64::MIN, sym).is_valid());
        assert!(!Asset::new(1, Symbol::from_parts(sym.code(), 19)).is_valid());
    }
}
