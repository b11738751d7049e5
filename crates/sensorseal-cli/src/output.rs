//! Output formatting utilities.

use serde::Serialize;

/// Formats a value as pretty JSON.
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats one batch root as a table row.
pub fn format_root_row(batch: usize, count: usize, root: &str) -> String {
    format!("{:<6} {:<6} {}", batch, count, root)
}

/// Prints the batch root table header.
#[allow(clippy::print_literal)]
pub fn print_root_header() {
    println!("{:<6} {:<6} {}", "BATCH", "COUNT", "MERKLE_ROOT");
    println!("{}", "-".repeat(78));
}

/// Formats lamports as whole units with nine decimals.
pub fn format_sol(lamports: u64) -> String {
    format!("{}.{:09}", lamports / 1_000_000_000, lamports % 1_000_000_000)
}
