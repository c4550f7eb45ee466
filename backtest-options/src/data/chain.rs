//! Option chain index: quote date -> expiration -> strike.
//!
//! Built once from an unordered batch of [`QuoteRecord`]s and read-only
//! afterwards. Each level is a vector sorted ascending, so lookups are
//! binary searches and iteration order never depends on hashing.
//!
//! Date lookups are forward-biased: a non-strict lookup returns the first
//! indexed date on or after the request, never an earlier one. Strike
//! lookups pick the listed strike nearest the target in either direction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::types::{OptionType, QuoteRecord, UnderlyingQuote};

/// Call and put quotes listed at one strike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrikeQuotes {
    pub strike: Decimal,
    pub call: Option<QuoteRecord>,
    pub put: Option<QuoteRecord>,
}

impl StrikeQuotes {
    fn new(strike: Decimal) -> Self {
        Self {
            strike,
            call: None,
            put: None,
        }
    }

    /// Quote on the requested side, if one was listed.
    pub fn quote(&self, option_type: OptionType) -> Option<&QuoteRecord> {
        match option_type {
            OptionType::Call => self.call.as_ref(),
            OptionType::Put => self.put.as_ref(),
        }
    }
}

/// All strikes for one expiration on one quote date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryChain {
    pub expiration: NaiveDate,
    strikes: Vec<StrikeQuotes>,
}

impl ExpiryChain {
    fn new(expiration: NaiveDate) -> Self {
        Self {
            expiration,
            strikes: Vec::new(),
        }
    }

    /// Records arrive sorted by strike; a repeated (strike, side) overwrites.
    fn insert(&mut self, record: QuoteRecord) {
        if self.strikes.last().map_or(true, |s| s.strike != record.strike) {
            self.strikes.push(StrikeQuotes::new(record.strike));
        }
        let last = self.strikes.len() - 1;
        let bucket = &mut self.strikes[last];
        match record.option_type {
            OptionType::Call => bucket.call = Some(record),
            OptionType::Put => bucket.put = Some(record),
        }
    }

    /// Strikes in ascending order.
    pub fn strikes(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.strikes.iter().map(|s| s.strike)
    }

    /// Look up a strike bucket.
    ///
    /// Strict lookups match `target` exactly. Otherwise the nearest listed
    /// strike is returned; on a tie between the strikes just below and just
    /// above `target`, the one above wins. A target above every listed
    /// strike finds nothing.
    pub fn strike_at(&self, target: Decimal, strict: bool) -> Option<&StrikeQuotes> {
        let idx = self.strikes.partition_point(|s| s.strike < target);
        let above = self.strikes.get(idx)?;
        if above.strike == target {
            return Some(above);
        }
        if strict {
            return None;
        }
        match idx.checked_sub(1).map(|i| &self.strikes[i]) {
            Some(below) if target - below.strike < above.strike - target => Some(below),
            _ => Some(above),
        }
    }
}

/// Everything quoted on a single date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteDateChain {
    pub quote_date: NaiveDate,
    underlying: Option<UnderlyingQuote>,
    expiries: Vec<ExpiryChain>,
}

impl QuoteDateChain {
    fn new(quote_date: NaiveDate) -> Self {
        Self {
            quote_date,
            underlying: None,
            expiries: Vec::new(),
        }
    }

    /// Records arrive sorted by (expiration, strike, type). The underlying
    /// quote comes from the first record with both sides quoted.
    fn insert(&mut self, record: QuoteRecord) {
        if self.underlying.is_none() && record.underlying_quote.is_quoted() {
            self.underlying = Some(record.underlying_quote);
        }
        if self
            .expiries
            .last()
            .map_or(true, |e| e.expiration != record.expiration)
        {
            self.expiries.push(ExpiryChain::new(record.expiration));
        }
        let last = self.expiries.len() - 1;
        self.expiries[last].insert(record);
    }

    /// Underlying bid/ask used for this date, if any row carried one.
    pub fn underlying(&self) -> Option<UnderlyingQuote> {
        self.underlying
    }

    /// Underlying midpoint price for this date.
    pub fn underlying_mid(&self) -> Option<Decimal> {
        self.underlying.map(|u| u.mid())
    }

    /// Expirations in ascending order.
    pub fn expirations(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.expiries.iter().map(|e| e.expiration)
    }

    /// Look up an expiration; non-strict returns the first one on or after `date`.
    pub fn expiry_at(&self, date: NaiveDate, strict: bool) -> Option<&ExpiryChain> {
        let idx = self.expiries.partition_point(|e| e.expiration < date);
        self.expiries
            .get(idx)
            .filter(|e| !strict || e.expiration == date)
    }
}

/// Three-level index over historical quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionChainIndex {
    chains: Vec<QuoteDateChain>,
}

impl OptionChainIndex {
    /// Build the index from quotes in any order.
    ///
    /// When the same (quote date, expiration, strike, type) appears more than
    /// once, the record that came later in the input wins.
    pub fn build<I>(records: I) -> Self
    where
        I: IntoIterator<Item = QuoteRecord>,
    {
        let mut records: Vec<QuoteRecord> = records.into_iter().collect();
        // Stable, so equal keys keep their input order.
        records.sort_by(|a, b| {
            (a.quote_date, a.expiration, a.strike, a.option_type).cmp(&(
                b.quote_date,
                b.expiration,
                b.strike,
                b.option_type,
            ))
        });

        let mut chains: Vec<QuoteDateChain> = Vec::new();
        for record in records {
            if chains
                .last()
                .map_or(true, |c| c.quote_date != record.quote_date)
            {
                chains.push(QuoteDateChain::new(record.quote_date));
            }
            let last = chains.len() - 1;
            chains[last].insert(record);
        }

        Self { chains }
    }

    /// Number of distinct quote dates.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Quote dates in ascending order.
    pub fn quote_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.chains.iter().map(|c| c.quote_date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.chains.first().map(|c| c.quote_date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.chains.last().map(|c| c.quote_date)
    }

    /// Look up the chain for a quote date; non-strict returns the earliest
    /// date on or after `date`.
    pub fn chain_at(&self, date: NaiveDate, strict: bool) -> Option<&QuoteDateChain> {
        let idx = self.chains.partition_point(|c| c.quote_date < date);
        self.chains
            .get(idx)
            .filter(|c| !strict || c.quote_date == date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{date, quote};
    use rust_decimal_macros::dec;

    fn sample() -> (Vec<QuoteRecord>, OptionChainIndex) {
        let records = vec![
            quote("2016-06-01", "2016-07-02", "116", "C", "1", "1", "116.5", "115.5"),
            quote("2016-06-01", "2016-07-02", "116", "P", "0.5", "0.5", "116.5", "115.5"),
            quote("2016-07-02", "2016-07-02", "116", "C", "0.5", "0.5", "118.5", "117.5"),
        ];
        let index = OptionChainIndex::build(records.clone());
        (records, index)
    }

    fn expiry_with_strikes(strikes: &[&str]) -> OptionChainIndex {
        let records = strikes
            .iter()
            .map(|s| quote("2016-06-01", "2016-07-02", s, "C", "1", "1", "101", "99"))
            .collect::<Vec<_>>();
        OptionChainIndex::build(records)
    }

    fn single_expiry(index: &OptionChainIndex) -> &ExpiryChain {
        index
            .chain_at(date("2016-06-01"), true)
            .and_then(|c| c.expiry_at(date("2016-07-02"), true))
            .unwrap()
    }

    #[test]
    fn test_chain_at_missing_after_last_date() {
        let (_, index) = sample();
        assert!(index.chain_at(date("2016-08-01"), false).is_none());
    }

    #[test]
    fn test_chain_at_strict_requires_exact_date() {
        let (_, index) = sample();
        assert!(index.chain_at(date("2016-05-01"), true).is_none());
        assert!(index.chain_at(date("2016-06-01"), true).is_some());
    }

    #[test]
    fn test_chain_at_forward_biased() {
        let (_, index) = sample();
        let chain = index.chain_at(date("2016-05-01"), false).unwrap();
        assert_eq!(chain.quote_date, date("2016-06-01"));

        // Between the two quote dates: never falls back to June 1st.
        let chain = index.chain_at(date("2016-06-02"), false).unwrap();
        assert_eq!(chain.quote_date, date("2016-07-02"));
    }

    #[test]
    fn test_underlying_mid() {
        let (_, index) = sample();
        let chain = index.chain_at(date("2016-06-01"), false).unwrap();
        assert_eq!(chain.underlying_mid(), Some(dec!(116)));
    }

    #[test]
    fn test_underlying_mid_skips_unquoted_rows() {
        let index = OptionChainIndex::build(vec![
            quote("2016-06-01", "2016-06-10", "100", "C", "1", "1", "0", "0"),
            quote("2016-06-01", "2016-07-02", "100", "C", "1", "1", "101", "99"),
        ]);
        let chain = index.chain_at(date("2016-06-01"), true).unwrap();
        assert_eq!(chain.underlying_mid(), Some(dec!(100)));
    }

    #[test]
    fn test_underlying_mid_independent_of_input_order() {
        let a = quote("2016-06-01", "2016-06-10", "100", "C", "1", "1", "101", "99");
        let b = quote("2016-06-01", "2016-07-02", "105", "C", "1", "1", "103", "101");
        let forward = OptionChainIndex::build(vec![a.clone(), b.clone()]);
        let backward = OptionChainIndex::build(vec![b, a]);
        assert_eq!(forward, backward);
        let chain = forward.chain_at(date("2016-06-01"), true).unwrap();
        assert_eq!(chain.underlying_mid(), Some(dec!(100)));
    }

    #[test]
    fn test_no_underlying_mid_when_never_quoted() {
        let index = OptionChainIndex::build(vec![quote(
            "2016-06-01", "2016-06-10", "100", "C", "1", "1", "0", "101",
        )]);
        let chain = index.chain_at(date("2016-06-01"), true).unwrap();
        assert_eq!(chain.underlying_mid(), None);
    }

    #[test]
    fn test_expiry_at() {
        let (_, index) = sample();
        let chain = index.chain_at(date("2016-06-01"), false).unwrap();

        assert!(chain.expiry_at(date("2016-06-01"), true).is_none());
        assert!(chain.expiry_at(date("2016-08-01"), false).is_none());

        let a = chain.expiry_at(date("2016-06-20"), false).unwrap();
        let b = chain.expiry_at(date("2016-07-02"), false).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.expiration, date("2016-07-02"));
    }

    #[test]
    fn test_strike_at_strict_and_nearest() {
        let (records, index) = sample();
        let chain = index.chain_at(date("2016-06-01"), false).unwrap();
        let expiry = chain.expiry_at(date("2016-06-20"), false).unwrap();

        assert!(expiry.strike_at(dec!(115), true).is_none());

        let nearest = expiry.strike_at(dec!(115), false).unwrap();
        let exact = expiry.strike_at(dec!(116), true).unwrap();
        assert_eq!(nearest, exact);
        assert_eq!(expiry.strike_at(dec!(116), false).unwrap(), exact);

        assert_eq!(exact.call.as_ref(), Some(&records[0]));
        assert_eq!(exact.put.as_ref(), Some(&records[1]));
    }

    #[test]
    fn test_strike_at_picks_closest() {
        let index = expiry_with_strikes(&["110", "115", "120"]);
        let expiry = single_expiry(&index);

        assert_eq!(expiry.strike_at(dec!(116), false).unwrap().strike, dec!(115));
        assert_eq!(expiry.strike_at(dec!(119), false).unwrap().strike, dec!(120));
        assert_eq!(expiry.strike_at(dec!(100), false).unwrap().strike, dec!(110));
        assert!(expiry.strike_at(dec!(120.01), false).is_none());
    }

    #[test]
    fn test_strike_at_tie_goes_above() {
        let index = expiry_with_strikes(&["115", "110", "120"]);
        let expiry = single_expiry(&index);
        assert_eq!(expiry.strike_at(dec!(117.5), false).unwrap().strike, dec!(120));
        assert_eq!(expiry.strike_at(dec!(112.5), false).unwrap().strike, dec!(115));
    }

    #[test]
    fn test_strikes_sorted_and_deduplicated() {
        let index = expiry_with_strikes(&["120", "110", "115.000", "115"]);
        let expiry = single_expiry(&index);
        let strikes: Vec<_> = expiry.strikes().collect();
        assert_eq!(strikes, vec![dec!(110), dec!(115), dec!(120)]);
    }

    #[test]
    fn test_latest_duplicate_wins() {
        let first = quote("2016-06-01", "2016-07-02", "116", "C", "1", "1", "116.5", "115.5");
        let second = quote("2016-06-01", "2016-07-02", "116", "C", "2", "2", "116.5", "115.5");
        let index = OptionChainIndex::build(vec![first, second.clone()]);
        let bucket = index
            .chain_at(date("2016-06-01"), true)
            .and_then(|c| c.expiry_at(date("2016-07-02"), true))
            .and_then(|e| e.strike_at(dec!(116), true))
            .unwrap();
        assert_eq!(bucket.call.as_ref(), Some(&second));
        assert!(bucket.put.is_none());
    }

    #[test]
    fn test_build_is_deterministic() {
        let (records, index) = sample();
        let mut reversed = records.clone();
        reversed.reverse();
        assert_eq!(OptionChainIndex::build(records), index);
        assert_eq!(OptionChainIndex::build(reversed), index);
    }

    #[test]
    fn test_dates_sorted() {
        let (_, index) = sample();
        let dates: Vec<_> = index.quote_dates().collect();
        assert_eq!(dates, vec![date("2016-06-01"), date("2016-07-02")]);
        assert_eq!(index.first_date(), Some(date("2016-06-01")));
        assert_eq!(index.last_date(), Some(date("2016-07-02")));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_empty_index() {
        let index = OptionChainIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.chain_at(date("2016-06-01"), false).is_none());
    }
}
