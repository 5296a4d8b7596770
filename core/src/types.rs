//! Shared primitive types used across the analysis.

/// A tax year. Every engine request is made for one year.
pub type Year = u16;

/// Two-letter postal code of a US state, upper case ("SC").
pub type StateCode = String;

/// Number of income deciles. Deciles are numbered 1..=DECILE_COUNT.
pub const DECILE_COUNT: usize = 10;
