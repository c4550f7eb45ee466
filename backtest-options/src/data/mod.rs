//! Option quote data: parsing, loading and the chain index.

pub mod chain;
pub mod import;
pub mod loader;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use chain::{ExpiryChain, OptionChainIndex, QuoteDateChain, StrikeQuotes};
pub use import::{ImportError, ImportStats, LiveVolImporter};
pub use loader::{read_quotes, DataLoader, LoaderError};
pub use types::{OptionType, QuoteError, QuoteRecord, RawQuote, UnderlyingQuote};
