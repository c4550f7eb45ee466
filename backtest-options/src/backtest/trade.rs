//! Legs and trade groups.
//!
//! Handles the lifecycle of one strategy cycle:
//! - Opening a leg (role, side, date, price, quantity)
//! - Closing it, which consumes the open leg and yields a [`ClosedLeg`]
//! - Signed profit per leg, scaled by the option contract multiplier
//! - Grouping legs opened and closed together into a [`TradeGroup`]

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Shares of stock bought against one short call.
pub const EQUITY_LOT: Decimal = Decimal::ONE_HUNDRED;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Profit overflow on leg {role}")]
    LegOverflow { role: LegRole },

    #[error("Profit overflow summing trade group")]
    GroupOverflow,

    #[error("Trade group has no legs")]
    EmptyGroup,
}

/// Side of the opening transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Side of the transaction that offsets this one.
    pub fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Kind of instrument traded by a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Equity,
    Option,
}

impl ProductKind {
    /// Profit scale: one option contract covers 100 shares.
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Equity => Decimal::ONE,
            Self::Option => CONTRACT_MULTIPLIER,
        }
    }
}

/// Role a leg plays within a trade group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegRole {
    /// Long stock.
    Stock,
    /// Call written against the stock.
    ShortCall,
    /// Far-dated protective put.
    LongPut,
}

impl LegRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stock => "buy-stock",
            Self::ShortCall => "covered-call",
            Self::LongPut => "far-put",
        }
    }

    pub fn product(&self) -> ProductKind {
        match self {
            Self::Stock => ProductKind::Equity,
            Self::ShortCall | Self::LongPut => ProductKind::Option,
        }
    }

    /// Opening side for this role.
    pub fn side(&self) -> Side {
        match self {
            Self::Stock | Self::LongPut => Side::Buy,
            Self::ShortCall => Side::Sell,
        }
    }
}

impl fmt::Display for LegRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An opened, not yet closed, leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenLeg {
    pub role: LegRole,
    /// Display name of the instrument, e.g. `SPY` or `116 C 2006-07-02`.
    pub instrument: String,
    pub side: Side,
    pub date: NaiveDate,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OpenLeg {
    /// Open a leg on the role's natural side.
    pub fn new(
        role: LegRole,
        instrument: impl Into<String>,
        date: NaiveDate,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        Self {
            role,
            instrument: instrument.into(),
            side: role.side(),
            date,
            price,
            quantity,
        }
    }

    pub fn product(&self) -> ProductKind {
        self.role.product()
    }

    /// Close the leg with the offsetting transaction.
    pub fn close(self, date: NaiveDate, price: Decimal) -> ClosedLeg {
        ClosedLeg {
            open: self,
            close_date: date,
            close_price: price,
        }
    }
}

/// A leg with both halves filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedLeg {
    pub open: OpenLeg,
    pub close_date: NaiveDate,
    pub close_price: Decimal,
}

impl ClosedLeg {
    pub fn role(&self) -> LegRole {
        self.open.role
    }

    pub fn open_date(&self) -> NaiveDate {
        self.open.date
    }

    pub fn open_price(&self) -> Decimal {
        self.open.price
    }

    /// Side of the closing transaction.
    pub fn close_side(&self) -> Side {
        self.open.side.opposite()
    }

    /// Signed profit of the round trip.
    ///
    /// Bought then sold: (close - open) x quantity. Sold then bought:
    /// (open - close) x quantity. Options are scaled by the contract
    /// multiplier.
    pub fn profit(&self) -> Result<Decimal, LedgerError> {
        let overflow = || LedgerError::LegOverflow { role: self.role() };
        let per_unit = match self.open.side {
            Side::Buy => self.close_price.checked_sub(self.open.price),
            Side::Sell => self.open.price.checked_sub(self.close_price),
        }
        .ok_or_else(overflow)?;

        per_unit
            .checked_mul(self.open.quantity)
            .and_then(|p| p.checked_mul(self.open.product().multiplier()))
            .ok_or_else(overflow)
    }
}

/// Legs opened and closed together as one strategy cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeGroup {
    legs: BTreeMap<LegRole, ClosedLeg>,
    profit: Decimal,
    open_date: NaiveDate,
    close_date: NaiveDate,
}

impl TradeGroup {
    /// Assemble closed legs, computing the aggregate profit.
    ///
    /// A later leg with the same role replaces an earlier one.
    pub fn new<I>(legs: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = ClosedLeg>,
    {
        let legs: BTreeMap<LegRole, ClosedLeg> =
            legs.into_iter().map(|leg| (leg.role(), leg)).collect();
        // Every leg shares these by construction; take the first.
        let (open_date, close_date) = legs
            .values()
            .next()
            .map(|leg| (leg.open_date(), leg.close_date))
            .ok_or(LedgerError::EmptyGroup)?;

        let mut profit = Decimal::ZERO;
        for leg in legs.values() {
            profit = profit
                .checked_add(leg.profit()?)
                .ok_or(LedgerError::GroupOverflow)?;
        }

        Ok(Self {
            legs,
            profit,
            open_date,
            close_date,
        })
    }

    /// Sum of the legs' profits.
    pub fn profit(&self) -> Decimal {
        self.profit
    }

    pub fn leg(&self, role: LegRole) -> Option<&ClosedLeg> {
        self.legs.get(&role)
    }

    /// Legs in role order.
    pub fn legs(&self) -> impl Iterator<Item = &ClosedLeg> {
        self.legs.values()
    }

    pub fn roles(&self) -> impl Iterator<Item = LegRole> + '_ {
        self.legs.keys().copied()
    }

    pub fn open_date(&self) -> NaiveDate {
        self.open_date
    }

    pub fn close_date(&self) -> NaiveDate {
        self.close_date
    }
}
