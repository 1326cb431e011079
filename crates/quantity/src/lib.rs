//! Exact decimal arithmetic over dimensional units

mod base_unit;
pub mod errors;
mod operator;
mod parser;
mod quantity;
mod rounding;
mod unit;
pub mod unit_database;

#[cfg(test)]
mod testing_tools;

// External Crate Imports
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Re-exports
pub use errors::{QuantityError, Result};
pub use operator::{Product, UnitOperator};
pub use rounding::handle_rounding;
pub use unit_database::{UnitDatabase, UnitDatabaseError};

// NOTE: For the types in this crate, 'u lifetimes indicate references to the `UnitDatabase`. Nothing below ever owns
// a `Prefix` or `Base`; those live in the database and are only ever borrowed

// Public API ==========================================================================================================

/// A measured value, as it crosses the crate boundary (to and from JSON or a user)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Decimal,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Decimal>,
}

/// A (possibly compound) unit carrying a running value, the working form of a [`Quantity`]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Unit<'u> {
    db: &'u UnitDatabase,
    sub_units: Vec<BaseUnit<'u>>,
    value: Decimal,
}

/// One `<prefix><base>[^exponent]` component of a [`Unit`]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BaseUnit<'u> {
    db: &'u UnitDatabase,
    prefix: &'u Prefix,
    base: &'u Base,
    exponent: i32,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct Prefix {
    symbol: String,
    name: String,
    exponent: i32,
}

// NOTE: `1 <symbol> = factor <origin>`, so the origin is the canonical base of this dimension
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct Base {
    symbol: String,
    name: String,
    origin: String,
    factor: Decimal,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
}

// ---------------------------------------------------------------------------------------------------------------------

impl Prefix {
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn exponent(&self) -> i32 {
        self.exponent
    }

    // NOTE: Prefixes on the ladder are the ones `scale_to_next()` is allowed to step between. c and d are valid
    // prefixes, but nobody wants to see an automatically rescaled "cmol"
    #[must_use]
    pub const fn on_ladder(&self) -> bool {
        self.exponent % 3 == 0
    }
}

impl Base {
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub const fn factor(&self) -> Decimal {
        self.factor
    }

    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.symbol == self.origin
    }
}

impl Direction {
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

// NOTE: The unit database is built once and then shared by reference between every unit computed from it, so it had
// better stay shareable between threads
static_assertions::assert_impl_all!(UnitDatabase: Send, Sync);
static_assertions::assert_impl_all!(Unit<'static>: Send, Sync, Clone);
