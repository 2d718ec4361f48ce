//! Per-model cost estimation for AI tasks.
//!
//! Prices are USD per thousand tokens. Models are matched by exact name;
//! anything unrecognised is billed at [`DEFAULT_PRICE_PER_1K`].

/// Known model pricing table (USD per 1K tokens).
const PRICING_TABLE: &[(&str, f64)] = &[
    ("gpt-4", 0.03),
    ("gpt-3.5-turbo", 0.002),
    ("claude-3-opus", 0.015),
    ("claude-3-sonnet", 0.003),
    ("claude-3-haiku", 0.0005),
];

/// Price applied to models missing from the table.
pub const DEFAULT_PRICE_PER_1K: f64 = 0.01;

/// Token budget assumed when a request does not give one.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Get the per-1K-token price for a model name.
pub fn price_per_1k(model: &str) -> f64 {
    PRICING_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map_or(DEFAULT_PRICE_PER_1K, |(_, price)| *price)
}

/// Estimate the cost in USD of running `model` for `max_tokens` tokens,
/// rounded to cents.
pub fn estimate_cost(model: &str, max_tokens: Option<u32>) -> f64 {
    let tokens = f64::from(max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));
    round_cents(price_per_1k(model) * tokens / 1000.0)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
