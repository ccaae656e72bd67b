use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MAX_SYMBOL_LEN;

// ---------------------------------------------------------------------------
// Symbol
// ---------------------------------------------------------------------------

/// Normalized ticker symbol: trimmed, uppercased, starts with a letter,
/// then letters, digits, `.` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,
    #[error("symbol is {len} characters, max {max}")]
    TooLong { len: usize, max: usize },
    #[error("symbol must start with a letter, got {0:?}")]
    InvalidStart(char),
    #[error("invalid character {ch:?} at {index}")]
    InvalidChar { ch: char, index: usize },
}

impl Symbol {
    pub fn parse(input: &str) -> Result<Self, SymbolError> {
        let normalized = input.trim().to_ascii_uppercase();
        let Some(first) = normalized.chars().next() else {
            return Err(SymbolError::Empty);
        };

        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(SymbolError::TooLong { len, max: MAX_SYMBOL_LEN });
        }
        if !first.is_ascii_alphabetic() {
            return Err(SymbolError::InvalidStart(first));
        }
        for (index, ch) in normalized.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '-') {
                return Err(SymbolError::InvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Serialized in camelCase, like every other key on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Price,
    DayHigh,
    DayLow,
    AvgVolume,
    MarketCap,
}

impl Attribute {
    pub const ALL: [Attribute; 5] = [
        Attribute::Price,
        Attribute::DayHigh,
        Attribute::DayLow,
        Attribute::AvgVolume,
        Attribute::MarketCap,
    ];
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Attribute::Price => "price",
            Attribute::DayHigh => "dayHigh",
            Attribute::DayLow => "dayLow",
            Attribute::AvgVolume => "avgVolume",
            Attribute::MarketCap => "marketCap",
        };
        write!(f, "{s}")
    }
}

/// One ticker's market facts for the day. `None` = unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSnapshot {
    pub price: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub avg_volume: Option<f64>,
    pub market_cap: Option<f64>,
}

impl AttributeSnapshot {
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        match attribute {
            Attribute::Price => self.price,
            Attribute::DayHigh => self.day_high,
            Attribute::DayLow => self.day_low,
            Attribute::AvgVolume => self.avg_volume,
            Attribute::MarketCap => self.market_cap,
        }
    }
}

// ---------------------------------------------------------------------------
// Hints
// ---------------------------------------------------------------------------

/// attribute → `(guess - secret) / secret`. Attributes unknown on either side
/// have no entry; an entry of 0 is an exact match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HintVector(BTreeMap<Attribute, f64>);

impl HintVector {
    pub fn insert(&mut self, attribute: Attribute, deviation: f64) {
        self.0.insert(attribute, deviation);
    }

    #[cfg(test)]
    pub fn get(&self, attribute: Attribute) -> Option<f64> {
        self.0.get(&attribute).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        self.0.iter().map(|(a, v)| (*a, *v))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

// ---------------------------------------------------------------------------
// Session records
// ---------------------------------------------------------------------------

/// One accepted guess. `attempt_index` is 1-based; guesses are kept oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRecord {
    pub ticker: Symbol,
    pub hints: HintVector,
    pub attempt_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    InProgress,
    Won,
    Lost,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Outcome::InProgress)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Outcome::InProgress => "in_progress",
            Outcome::Won => "won",
            Outcome::Lost => "lost",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(Outcome::InProgress),
            "won" => Ok(Outcome::Won),
            "lost" => Ok(Outcome::Lost),
            other => Err(format!("unknown outcome {other:?}")),
        }
    }
}

/// Payload revealed once a session is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalResult {
    pub win: bool,
    pub total_guesses: u32,
    pub secret_ticker: Symbol,
}
