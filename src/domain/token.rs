//! Static token registry: address -> (symbol, decimals), loaded once at boot.

use crate::domain::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A registered ERC-20 token. Immutable once registered; `decimals` must match
/// the token contract or every formatted amount for it is silently wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Error)]
pub enum TokenRegistryError {
    #[error("invalid token entry {0:?}, expected address:symbol:decimals")]
    InvalidEntry(String),
    #[error("duplicate token registration for {0}")]
    Duplicate(Address),
}

/// Immutable lookup table from token address to token metadata.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_address: HashMap<Address, Token>,
}

impl TokenRegistry {
    /// Build a registry from `address:symbol:decimals` entries.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, TokenRegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut by_address = HashMap::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            let mut parts = entry.split(':');
            let (address, symbol, decimals) = match (parts.next(), parts.next(), parts.next()) {
                (Some(a), Some(s), Some(d)) if parts.next().is_none() => (a, s, d),
                _ => return Err(TokenRegistryError::InvalidEntry(entry.to_string())),
            };
            let decimals: u8 = decimals
                .parse()
                .map_err(|_| TokenRegistryError::InvalidEntry(entry.to_string()))?;
            let token = Token {
                address: Address::new(address),
                symbol: symbol.to_string(),
                decimals,
            };
            if by_address.insert(token.address.clone(), token.clone()).is_some() {
                return Err(TokenRegistryError::Duplicate(token.address));
            }
        }
        Ok(TokenRegistry { by_address })
    }

    /// Look up a token by its contract address.
    pub fn get(&self, address: &Address) -> Option<&Token> {
        self.by_address.get(address)
    }

    /// Decimals for a token address, if registered.
    pub fn decimals(&self, address: &Address) -> Option<u8> {
        self.get(address).map(|t| t.decimals)
    }

    /// All registered tokens, in stable (address) order.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut tokens: Vec<_> = self.by_address.values().collect();
        tokens.sort_by(|a, b| a.address.cmp(&b.address));
        tokens
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
