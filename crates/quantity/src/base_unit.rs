use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;
use tracing::trace;

use crate::{Base, BaseUnit, Direction, Prefix, QuantityError, Result, UnitDatabase, parser};

impl<'u> BaseUnit<'u> {
    /// Parses a single `<prefix><base>[^exponent]` token, like `mg`, `mol` or `s^-1`
    pub fn parse(db: &'u UnitDatabase, token: &str) -> Result<Self> {
        parser::base_unit(db, token, 0, token)
    }

    pub(crate) const fn new(
        db: &'u UnitDatabase,
        prefix: &'u Prefix,
        base: &'u Base,
        exponent: i32,
    ) -> Self {
        Self {
            db,
            prefix,
            base,
            exponent,
        }
    }

    #[must_use]
    pub const fn prefix(&self) -> &'u Prefix {
        self.prefix
    }

    #[must_use]
    pub const fn base(&self) -> &'u Base {
        self.base
    }

    #[must_use]
    pub const fn exponent(&self) -> i32 {
        self.exponent
    }

    /// The factor of this unit's prefix, raised to its exponent: `1000` for `km`, `0.000001` for `mm^2`
    pub fn conversion_factor(&self) -> Result<Decimal> {
        pow10(i64::from(self.prefix.exponent) * i64::from(self.exponent))
            .ok_or_else(|| QuantityError::overflow(self).into())
    }

    /// The `(factor, origin, symbol)` triple relating this unit's base to the canonical base of its dimension
    #[must_use]
    pub fn unit_type(&self) -> (Decimal, &'u str, &'u str) {
        (self.base.factor, &self.base.origin, &self.base.symbol)
    }

    /// Rescales to the prefix of `target` (a unit symbol like `kg`), returning the factor any value in the old unit
    /// must be multiplied by. The base is never changed by a rescaling, so `target` must share this unit's base.
    pub fn scale_to(&mut self, target: &str) -> Result<Decimal> {
        let (prefix, base) = self
            .db
            .resolve(target)
            .ok_or_else(|| QuantityError::unknown_unit(target, 0, target))?;
        if base != self.base {
            return Err(QuantityError::incompatible_units(
                &*self,
                target,
                "a rescaling can't change the base of a unit",
            )
            .into());
        }
        self.scale_to_prefix(prefix)
    }

    pub(crate) fn scale_to_prefix(&mut self, prefix: &'u Prefix) -> Result<Decimal> {
        let shift = i64::from(self.prefix.exponent - prefix.exponent) * i64::from(self.exponent);
        let factor = pow10(shift).ok_or_else(|| QuantityError::overflow(&*self))?;
        self.prefix = prefix;
        Ok(factor)
    }

    /// Steps one rung up or down the prefix ladder, returning `None` (and leaving the unit untouched) when there are
    /// no more prefixes in that direction
    pub fn scale_to_next(&mut self, direction: Direction) -> Result<Option<Decimal>> {
        let Some(prefix) = self.db.next_prefix(self.prefix, direction) else {
            return Ok(None);
        };
        self.scale_to_prefix(prefix).map(Some)
    }

    /// Converts between physically equivalent bases of the same exponent, like `min` to `s` or `mL^-1` to `L^-1`
    pub fn convert_to_new_base(&mut self, target: &str) -> Result<Decimal> {
        let target = Self::parse(self.db, target)?;
        if target.base.origin != self.base.origin {
            return Err(QuantityError::incompatible_units(
                &*self,
                target,
                "their bases measure different dimensions",
            )
            .into());
        }
        if target.exponent != self.exponent {
            return Err(QuantityError::incompatible_units(
                &*self,
                target,
                "their exponents differ",
            )
            .into());
        }
        self.convert_to(target.prefix, target.base)
    }

    pub fn invert(&mut self) {
        self.exponent = -self.exponent;
    }

    /// Converts to the unprefixed, canonical base of this unit's dimension: `mg` to `g`, `min` to `s`
    pub fn convert_to_base_type(&mut self) -> Result<Decimal> {
        let base = self.db.canonical_base(self.base);
        let prefix = self.db.base_prefix();
        if base == self.base {
            self.scale_to_prefix(prefix)
        } else {
            self.convert_to(prefix, base)
        }
    }

    fn convert_to(&mut self, prefix: &'u Prefix, base: &'u Base) -> Result<Decimal> {
        let overflow = || QuantityError::overflow(&*self);
        let shift = i64::from(self.prefix.exponent - prefix.exponent) * i64::from(self.exponent);
        let ratio = self
            .base
            .factor
            .checked_div(base.factor)
            .ok_or_else(overflow)?;
        let factor = pow10(shift)
            .zip(powi(ratio, self.exponent))
            .and_then(|(p, b)| p.checked_mul(b))
            .ok_or_else(overflow)?;
        trace!(from = %self, to = %base.symbol, %factor, "converting base");

        self.prefix = prefix;
        self.base = base;
        Ok(factor)
    }
}

impl Display for BaseUnit<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix.symbol, self.base.symbol)?;
        if self.exponent != 1 {
            write!(f, "^{}", self.exponent)?;
        }
        Ok(())
    }
}

// NOTE: A `Decimal` has 96 bits of mantissa, so the largest exact power of ten is 10^28 and the smallest is 10^-28
const MAX_POW10: i64 = 28;

fn pow10(n: i64) -> Option<Decimal> {
    if n.abs() > MAX_POW10 {
        return None;
    }
    let magnitude = u32::try_from(n.abs()).ok()?;
    if n < 0 {
        Some(Decimal::new(1, magnitude))
    } else {
        Decimal::try_from_i128_with_scale(10_i128.pow(magnitude), 0).ok()
    }
}

fn powi(x: Decimal, n: i32) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..n.unsigned_abs() {
        acc = acc.checked_mul(x)?;
    }
    if n < 0 {
        Decimal::ONE.checked_div(acc)
    } else {
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use rust_decimal_macros::dec;

    use super::*;

    static DB: LazyLock<UnitDatabase> = LazyLock::new(UnitDatabase::default);

    fn unit(token: &str) -> BaseUnit<'static> {
        BaseUnit::parse(&DB, token).unwrap()
    }

    #[test]
    fn powers_of_ten() {
        assert_eq!(pow10(0), Some(dec!(1)));
        assert_eq!(pow10(3), Some(dec!(1000)));
        assert_eq!(pow10(-3), Some(dec!(0.001)));
        assert_eq!(pow10(28), Some(dec!(10000000000000000000000000000)));
        assert_eq!(pow10(-28), Some(dec!(0.0000000000000000000000000001)));
        assert_eq!(pow10(29), None);
        assert_eq!(pow10(-29), None);

        assert_eq!(powi(dec!(60), 2), Some(dec!(3600)));
        assert_eq!(powi(dec!(4), -1), Some(dec!(0.25)));
        assert_eq!(powi(dec!(7), 0), Some(dec!(1)));
    }

    #[test]
    fn conversion_factor() {
        assert_eq!(unit("km").conversion_factor().unwrap(), dec!(1000));
        assert_eq!(unit("mm^2").conversion_factor().unwrap(), dec!(0.000001));
        assert_eq!(unit("mL^-1").conversion_factor().unwrap(), dec!(1000));
        assert_eq!(unit("g").conversion_factor().unwrap(), dec!(1));
        assert!(unit("Gg^4").conversion_factor().unwrap_err().is_overflow());
    }

    #[test]
    fn unit_type() {
        assert_eq!(unit("kmin").unit_type(), (dec!(60), "s", "min"));
        assert_eq!(unit("mg").unit_type(), (dec!(1), "g", "g"));
    }

    #[test]
    fn scale_to() {
        let mut mg = unit("mg");
        assert_eq!(mg.scale_to("g").unwrap(), dec!(0.001));
        assert_eq!(mg.to_string(), "g");
        assert_eq!(mg.scale_to("kg").unwrap(), dec!(0.001));
        assert_eq!(mg.to_string(), "kg");
        assert_eq!(mg.scale_to("kg").unwrap(), dec!(1));

        let mut per_ml = unit("mL^-1");
        assert_eq!(per_ml.scale_to("L").unwrap(), dec!(1000));
        assert_eq!(per_ml.to_string(), "L^-1");

        let mut cm2 = unit("cm^2");
        assert_eq!(cm2.scale_to("m").unwrap(), dec!(0.0001));

        let err = unit("mg").scale_to("mL").unwrap_err();
        assert!(err.is_incompatible_units());
        let err = unit("mg").scale_to("xg").unwrap_err();
        assert!(err.is_unknown_unit());
    }

    #[test]
    fn scale_round_trip() {
        for (from, to) in [("mg", "kg"), ("ug", "Gg"), ("cL", "L"), ("fmol", "mmol")] {
            let mut u = unit(from);
            let value = dec!(123.456);
            let there = value * u.scale_to(to).unwrap();
            let back = there * u.scale_to(from).unwrap();
            assert_eq!(back, value, "{from} -> {to} -> {from}");
        }
    }

    #[test]
    fn scale_to_next() {
        let mut u = unit("mg");
        assert_eq!(u.scale_to_next(Direction::Up).unwrap(), Some(dec!(0.001)));
        assert_eq!(u.to_string(), "g");
        assert_eq!(u.scale_to_next(Direction::Up).unwrap(), Some(dec!(0.001)));
        assert_eq!(u.to_string(), "kg");
        assert_eq!(u.scale_to_next(Direction::Down).unwrap(), Some(dec!(1000)));
        assert_eq!(u.to_string(), "g");
        assert_eq!(u.scale_to_next(Direction::Down).unwrap(), Some(dec!(1000)));
        assert_eq!(u.to_string(), "mg");

        let mut u = unit("s^-1");
        assert_eq!(u.scale_to_next(Direction::Down).unwrap(), Some(dec!(0.001)));
        assert_eq!(u.to_string(), "ms^-1");

        let mut u = unit("cL");
        assert_eq!(u.scale_to_next(Direction::Up).unwrap(), Some(dec!(0.01)));
        assert_eq!(u.to_string(), "L");

        let mut top = unit("Gg");
        assert_eq!(top.scale_to_next(Direction::Up).unwrap(), None);
        assert_eq!(top.to_string(), "Gg");
        let mut bottom = unit("fmol");
        assert_eq!(bottom.scale_to_next(Direction::Down).unwrap(), None);
        assert_eq!(bottom.to_string(), "fmol");
    }

    #[test]
    fn convert_to_new_base() {
        let mut u = unit("min");
        assert_eq!(u.convert_to_new_base("s").unwrap(), dec!(60));
        assert_eq!(u.to_string(), "s");

        let mut u = unit("h");
        assert_eq!(u.convert_to_new_base("min").unwrap(), dec!(60));

        let mut u = unit("min^-1");
        assert_eq!(u.convert_to_new_base("s^-1").unwrap(), dec!(1) / dec!(60));
        assert_eq!(u.to_string(), "s^-1");

        let mut u = unit("kcal");
        assert_eq!(u.convert_to_new_base("J").unwrap(), dec!(4184));

        let mut u = unit("atm");
        assert_eq!(u.convert_to_new_base("kPa").unwrap(), dec!(101.325));

        let err = unit("min").convert_to_new_base("g").unwrap_err();
        assert!(err.is_incompatible_units());
        let err = unit("min").convert_to_new_base("s^2").unwrap_err();
        assert!(err.is_incompatible_units());
    }

    #[test]
    fn convert_to_base_type() {
        let cases = [
            ("mg", "g", dec!(0.001)),
            ("mmol", "mol", dec!(0.001)),
            ("min", "s", dec!(60)),
            ("kcal", "J", dec!(4184)),
            ("mL^-1", "L^-1", dec!(1000)),
            ("g", "g", dec!(1)),
        ];
        for (from, to, factor) in cases {
            let mut u = unit(from);
            assert_eq!(u.convert_to_base_type().unwrap(), factor, "{from}");
            assert_eq!(u.to_string(), to);
        }
    }

    #[test]
    fn invert() {
        let mut u = unit("mL^2");
        u.invert();
        assert_eq!(u.to_string(), "mL^-2");
        assert_eq!(u.conversion_factor().unwrap(), dec!(1000000));
        u.invert();
        assert_eq!(u, unit("mL^2"));
    }
}
