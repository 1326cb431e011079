use derive_more::{IsVariant, Unwrap};
use rust_decimal::Decimal;
use tracing::trace;

use crate::{BaseUnit, QuantityError, Result, Unit};

/// Arithmetic between whole (possibly compound) units
pub struct UnitOperator;

/// The result of multiplying or dividing two units: a bare number if every dimension cancelled out
#[derive(Clone, Eq, PartialEq, Debug, IsVariant, Unwrap)]
pub enum Product<'u> {
    Scalar(Decimal),
    Unit(Unit<'u>),
}

impl UnitOperator {
    /// Adds up dimensionally identical units, after rescaling them all to `scale` (or to the unit of the first
    /// summand when no `scale` is given). Summing nothing gives `None`.
    pub fn sum<'u>(units: &[Unit<'u>], scale: Option<&str>) -> Result<Option<Unit<'u>>> {
        let Some(first) = units.first() else {
            return Ok(None);
        };

        let dimensions = first.base_map();
        if let Some(odd_one_out) = units.iter().find(|u| u.base_map() != dimensions) {
            return Err(QuantityError::incompatible_units(
                odd_one_out.unit(),
                first.unit(),
                "they measure different dimensions",
            )
            .into());
        }

        let target = scale.map_or_else(|| first.unit(), ToOwned::to_owned);
        let target_unit = Unit::new(first.db(), Decimal::ONE, &target)?;
        if target_unit.base_map() != dimensions {
            return Err(QuantityError::incompatible_units(
                first.unit(),
                &target,
                "they measure different dimensions",
            )
            .into());
        }

        let mut total = Decimal::ZERO;
        for unit in units {
            let mut unit = unit.clone();
            if !unit.align_with(&target_unit) {
                return Err(QuantityError::incompatible_units(
                    unit.unit(),
                    &target,
                    "their components don't pair off",
                )
                .into());
            }
            unit.convert_to(&target)?;
            total = total
                .checked_add(unit.value())
                .ok_or_else(|| QuantityError::overflow(&unit))?;
        }

        Unit::new(first.db(), total, &target).map(Some)
    }

    pub fn multiply<'u>(lhs: &Unit<'u>, rhs: &Unit<'u>) -> Result<Product<'u>> {
        let mut lhs = lhs.clone();
        let mut rhs = rhs.clone();
        lhs.convert_to_base_type()?;
        rhs.convert_to_base_type()?;
        Self::merge(&lhs, &rhs)
    }

    pub fn divide<'u>(lhs: &Unit<'u>, rhs: &Unit<'u>) -> Result<Product<'u>> {
        let mut lhs = lhs.clone();
        let mut rhs = rhs.clone();
        lhs.convert_to_base_type()?;
        rhs.convert_to_base_type()?;
        rhs.invert()?;
        Self::merge(&lhs, &rhs)
    }

    // NOTE: Both units must already be in their base types, so components sharing a base also share a prefix
    fn merge<'u>(lhs: &Unit<'u>, rhs: &Unit<'u>) -> Result<Product<'u>> {
        let value = lhs
            .value()
            .checked_mul(rhs.value())
            .ok_or_else(|| QuantityError::overflow(format!("{lhs} * {rhs}")))?;

        let mut merged: Vec<BaseUnit<'u>> = Vec::new();
        for &unit in lhs.sub_units().iter().chain(rhs.sub_units()) {
            match merged.iter_mut().find(|m| m.base() == unit.base()) {
                Some(existing) => {
                    *existing = BaseUnit::new(
                        lhs.db(),
                        existing.prefix(),
                        existing.base(),
                        existing.exponent() + unit.exponent(),
                    );
                }
                None => merged.push(unit),
            }
        }
        merged.retain(|u| u.exponent() != 0);

        let product = if merged.is_empty() {
            Product::Scalar(value)
        } else {
            Product::Unit(Unit::from_parts(lhs.db(), merged, value))
        };
        trace!(%lhs, %rhs, ?product, "merged units");
        Ok(product)
    }
}
