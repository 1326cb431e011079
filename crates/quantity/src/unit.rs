use std::{
    cmp::Reverse,
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

use itertools::Itertools;
use rust_decimal::Decimal;
use tracing::trace;

use crate::{
    BaseUnit, Direction, Quantity, QuantityError, Result, Unit, UnitDatabase, parser,
};

impl<'u> Unit<'u> {
    pub fn new(db: &'u UnitDatabase, value: Decimal, unit: &str) -> Result<Self> {
        let sub_units = parser::unit(db, unit)?;
        Ok(Self::from_parts(db, sub_units, value))
    }

    pub fn from_quantity(db: &'u UnitDatabase, quantity: &Quantity) -> Result<Self> {
        Self::new(db, quantity.value, &quantity.unit)
    }

    pub(crate) fn from_parts(
        db: &'u UnitDatabase,
        mut sub_units: Vec<BaseUnit<'u>>,
        value: Decimal,
    ) -> Self {
        sub_units.sort_by_key(|u| Reverse(u.exponent()));
        Self {
            db,
            sub_units,
            value,
        }
    }

    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.value
    }

    #[must_use]
    pub fn sub_units(&self) -> &[BaseUnit<'u>] {
        &self.sub_units
    }

    pub fn numerator(&self) -> impl Iterator<Item = &BaseUnit<'u>> {
        self.sub_units.iter().filter(|u| u.exponent() > 0)
    }

    pub fn denominator(&self) -> impl Iterator<Item = &BaseUnit<'u>> {
        self.sub_units.iter().filter(|u| u.exponent() < 0)
    }

    /// The canonical string for this unit: its components, in order of descending exponent, joined by `*`
    #[must_use]
    pub fn unit(&self) -> String {
        self.sub_units.iter().join("*")
    }

    #[must_use]
    pub fn to_quantity(&self) -> Quantity {
        Quantity::new(self.value, self.unit())
    }

    /// Rescales every component to the prefixes used by `unit`, which must list the same bases with the same
    /// exponents, in the same order
    pub fn convert_to(&mut self, unit: &str) -> Result<()> {
        let target = parser::unit(self.db, unit)?;
        let target = Self::from_parts(self.db, target, Decimal::ONE);
        if target.sub_units.len() != self.sub_units.len() {
            return Err(QuantityError::invalid_conversion(
                self.unit(),
                target.unit(),
                "they have a different number of components",
            )
            .into());
        }

        for (old, new) in self.sub_units.iter().zip(&target.sub_units) {
            if old.base() != new.base() {
                return Err(QuantityError::invalid_conversion(
                    self.unit(),
                    target.unit(),
                    "their bases don't line up",
                )
                .into());
            }
            if old.exponent() != new.exponent() {
                return Err(QuantityError::invalid_conversion(
                    self.unit(),
                    target.unit(),
                    "their exponents don't line up",
                )
                .into());
            }
        }

        self.apply(|units| {
            units
                .iter_mut()
                .zip(&target.sub_units)
                .map(|(old, new)| old.scale_to_prefix(new.prefix()))
                .collect()
        })
    }

    /// Rescales every component to the same prefix, given by symbol (`"k"`) or name (`"kilo"` or `"base"`)
    pub fn scale_to_prefix(&mut self, prefix: &str) -> Result<()> {
        let prefix = self
            .db
            .prefix(prefix)
            .ok_or_else(|| QuantityError::unknown_prefix(prefix))?;
        self.apply(|units| units.iter_mut().map(|u| u.scale_to_prefix(prefix)).collect())
    }

    /// Steps every component one rung along the prefix ladder. If any component has run out of prefixes, nothing
    /// changes and `false` is returned.
    pub fn scale_to_next(&mut self, direction: Direction) -> Result<bool> {
        let mut stepped = self.sub_units.clone();
        let mut factors = Vec::with_capacity(stepped.len());
        for unit in &mut stepped {
            match unit.scale_to_next(direction)? {
                Some(factor) => factors.push(factor),
                None => return Ok(false),
            }
        }
        self.value = self.scaled_value(factors)?;
        self.sub_units = stepped;
        Ok(true)
    }

    /// Steps only the leading (highest exponent) component one rung along the prefix ladder
    pub(crate) fn scale_leading_to_next(&mut self, direction: Direction) -> Result<bool> {
        let Some(leading) = self.sub_units.first_mut() else {
            return Ok(false);
        };
        let Some(factor) = leading.scale_to_next(direction)? else {
            return Ok(false);
        };
        self.value = self.scaled_value([factor])?;
        Ok(true)
    }

    pub fn convert_to_base_type(&mut self) -> Result<()> {
        self.apply(|units| units.iter_mut().map(BaseUnit::convert_to_base_type).collect())
    }

    /// Inverts every component along with the value, turning `2 g*mol^-1` into `0.5 mol*g^-1`
    pub fn invert(&mut self) -> Result<()> {
        if self.value.is_zero() {
            return Err(QuantityError::ZeroInverse(self.to_string()).into());
        }
        self.value = Decimal::ONE
            .checked_div(self.value)
            .ok_or_else(|| QuantityError::overflow(&*self))?;
        for unit in &mut self.sub_units {
            unit.invert();
        }
        self.sub_units.sort_by_key(|u| Reverse(u.exponent()));
        Ok(())
    }

    /// Maps every base (by symbol) to its total exponent. Units are dimensionally compatible when these match.
    pub(crate) fn base_map(&self) -> BTreeMap<&'u str, i32> {
        let mut map = BTreeMap::new();
        for unit in &self.sub_units {
            *map.entry(unit.base().symbol()).or_default() += unit.exponent();
        }
        map.retain(|_, exponent| *exponent != 0);
        map
    }

    /// Reorders components to follow `other`, matching each by base and exponent. Returns `false` (leaving this
    /// unit as it was) when the components can't be paired off one-to-one.
    pub(crate) fn align_with(&mut self, other: &Self) -> bool {
        let mut remaining = self.sub_units.clone();
        let mut aligned = Vec::with_capacity(remaining.len());
        for unit in &other.sub_units {
            let Some(index) = remaining
                .iter()
                .position(|u| u.base() == unit.base() && u.exponent() == unit.exponent())
            else {
                return false;
            };
            aligned.push(remaining.remove(index));
        }
        if !remaining.is_empty() {
            return false;
        }
        self.sub_units = aligned;
        true
    }

    pub(crate) const fn db(&self) -> &'u UnitDatabase {
        self.db
    }

    // NOTE: Works on a copy of the sub-units, so that a failure part way through leaves this unit untouched
    fn apply(
        &mut self,
        op: impl FnOnce(&mut [BaseUnit<'u>]) -> Result<Vec<Decimal>>,
    ) -> Result<()> {
        let mut updated = self.sub_units.clone();
        let factors = op(&mut updated)?;
        self.value = self.scaled_value(factors)?;
        trace!(from = %self, to = %updated.iter().join("*"), "rescaled unit");
        self.sub_units = updated;
        Ok(())
    }

    fn scaled_value(&self, factors: impl IntoIterator<Item = Decimal>) -> Result<Decimal> {
        factors
            .into_iter()
            .try_fold(self.value, Decimal::checked_mul)
            .ok_or_else(|| QuantityError::overflow(self).into())
    }
}

impl Display for Unit<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit())
    }
}
