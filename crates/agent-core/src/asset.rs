//! Assets under analysis

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
}

/// A tradable asset identified by its symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub class: AssetClass,
}

impl Asset {
    /// Create an asset; the symbol is trimmed and upper-cased
    pub fn new(symbol: impl AsRef<str>, class: AssetClass) -> Result<Self> {
        let symbol = symbol.as_ref().trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidInput("asset symbol is empty".to_string()));
        }
        Ok(Self { symbol, class })
    }

    pub fn stock(symbol: impl AsRef<str>) -> Result<Self> {
        Self::new(symbol, AssetClass::Stock)
    }

    pub fn crypto(symbol: impl AsRef<str>) -> Result<Self> {
        Self::new(symbol, AssetClass::Crypto)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}
