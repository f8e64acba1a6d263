// crates/keel-cli/src/output.rs
//
// Output formatting utilities for the Keel CLI.
// Wad amounts print as whole tokens with trailing zeros trimmed.

use serde::Serialize;
use tabled::{Table, Tabled};

use keel_core::{Wad, WAD};

/// Format a wad amount as a decimal token quantity.
pub fn fmt_wad(amount: Wad) -> String {
    let whole = amount / WAD;
    let frac = amount % WAD;
    if frac == 0 {
        format!("{}", whole)
    } else {
        let frac_str = format!("{:018}", frac);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

/// Format a slice of Tabled items as a table string.
pub fn format_table<T: Tabled>(data: &[T]) -> String {
    Table::new(data).to_string()
}

/// Format a serializable value as a pretty-printed JSON string.
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("JSON serialization error: {}", e))
}

/// A labelled balance row.
#[derive(Debug, Tabled)]
pub struct BalanceRow {
    #[tabled(rename = "account")]
    pub account: String,
    #[tabled(rename = "token")]
    pub token: String,
    #[tabled(rename = "balance")]
    pub balance: String,
}

/// A scheduled exit epoch row.
#[derive(Debug, Tabled)]
pub struct EpochRow {
    #[tabled(rename = "epoch")]
    pub epoch: u64,
    #[tabled(rename = "amount")]
    pub amount: String,
}

/// A harvest pool row.
#[derive(Debug, Tabled)]
pub struct PoolRow {
    #[tabled(rename = "pool")]
    pub pool: String,
    #[tabled(rename = "share")]
    pub share: u32,
    #[tabled(rename = "received")]
    pub received: String,
}
