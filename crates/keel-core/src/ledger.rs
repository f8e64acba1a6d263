// crates/keel-core/src/ledger.rs
//
// Multi-token balance ledger for the Keel Protocol.
//
// The ledger tracks, per registered token, the balance of every account and
// the total minted supply. It is the primitive every component builds on:
// the treasury, the exit queue, and the AMM all move value exclusively
// through `mint`, `burn`, and `transfer`. Each mutator validates first and
// applies second, so a failed call leaves the ledger untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::KeelError;
use crate::hex;
use crate::identity::AccountId;
use crate::wad::Wad;

/// A fungible token identifier (32 bytes). Serializes as a hex string so
/// it is usable as a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub [u8; 32]);

impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        hex::deserialize(deserializer).map(Self)
    }
}

impl TokenId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a token id from a short label. See `AccountId::from_label`.
    pub fn from_label(label: &str) -> Self {
        let mut bytes = [0u8; 32];
        for (slot, b) in bytes.iter_mut().zip(label.as_bytes()) {
            *slot = *b;
        }
        Self(bytes)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:02x}{:02x}{:02x}{:02x}…",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// Per-token balance book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenBook {
    balances: BTreeMap<AccountId, Wad>,
    total_supply: Wad,
}

/// The protocol ledger: balances and total supply for every registered token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    tokens: BTreeMap<TokenId, TokenBook>,
}

impl Ledger {
    /// Create an empty ledger with no registered tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token. Idempotent.
    pub fn register_token(&mut self, token: TokenId) {
        self.tokens.entry(token).or_default();
    }

    /// Whether a token is registered.
    pub fn has_token(&self, token: TokenId) -> bool {
        self.tokens.contains_key(&token)
    }

    /// Balance of `account` in `token`. Unregistered tokens and unknown
    /// accounts read as zero.
    pub fn balance(&self, token: TokenId, account: AccountId) -> Wad {
        self.tokens
            .get(&token)
            .and_then(|book| book.balances.get(&account))
            .copied()
            .unwrap_or(0)
    }

    /// Total minted supply of `token`. Unregistered tokens read as zero.
    pub fn total_supply(&self, token: TokenId) -> Wad {
        self.tokens
            .get(&token)
            .map(|book| book.total_supply)
            .unwrap_or(0)
    }

    /// Mint `amount` of `token` to `account`, growing total supply.
    ///
    /// # Errors
    /// `UnknownToken` if the token is not registered; `Overflow` if total
    /// supply or the account balance would exceed `Wad::MAX`.
    pub fn mint(&mut self, token: TokenId, to: AccountId, amount: Wad) -> Result<(), KeelError> {
        let book = self.book_mut(token)?;
        let new_supply = book
            .total_supply
            .checked_add(amount)
            .ok_or(KeelError::Overflow)?;
        let balance = book.balances.entry(to).or_insert(0);
        let new_balance = balance.checked_add(amount).ok_or(KeelError::Overflow)?;
        *balance = new_balance;
        book.total_supply = new_supply;
        Ok(())
    }

    /// Burn `amount` of `token` from `account`, shrinking total supply.
    ///
    /// # Errors
    /// `UnknownToken` if the token is not registered; `InsufficientBalance`
    /// if the account holds less than `amount`.
    pub fn burn(&mut self, token: TokenId, from: AccountId, amount: Wad) -> Result<(), KeelError> {
        let book = self.book_mut(token)?;
        let balance = book.balances.get(&from).copied().unwrap_or(0);
        if balance < amount {
            return Err(KeelError::InsufficientBalance {
                requested: amount,
                available: balance,
            });
        }
        book.balances.insert(from, balance - amount);
        book.total_supply -= amount;
        Ok(())
    }

    /// Move `amount` of `token` from one account to another.
    ///
    /// # Errors
    /// `UnknownToken` if the token is not registered; `InsufficientBalance`
    /// if `from` holds less than `amount`.
    pub fn transfer(
        &mut self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Wad,
    ) -> Result<(), KeelError> {
        if from == to {
            return Ok(());
        }
        let book = self.book_mut(token)?;
        let from_balance = book.balances.get(&from).copied().unwrap_or(0);
        if from_balance < amount {
            return Err(KeelError::InsufficientBalance {
                requested: amount,
                available: from_balance,
            });
        }
        let to_balance = book.balances.get(&to).copied().unwrap_or(0);
        let new_to = to_balance.checked_add(amount).ok_or(KeelError::Overflow)?;
        book.balances.insert(from, from_balance - amount);
        book.balances.insert(to, new_to);
        Ok(())
    }

    fn book_mut(&mut self, token: TokenId) -> Result<&mut TokenBook, KeelError> {
        self.tokens
            .get_mut(&token)
            .ok_or_else(|| KeelError::UnknownToken(token.to_string()))
    }
}
