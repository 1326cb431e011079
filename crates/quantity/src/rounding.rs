use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

use crate::{Direction, Quantity, Result, Unit, UnitDatabase};

// NOTE: Values are kept within [10^-3, 10^3) when the exponent is being adjusted
const SMALL_MAGNITUDE: i64 = -3;
const LARGE_MAGNITUDE: i64 = 3;

const DEFAULT_PLACES: u32 = 4;
const SMALL_PLACES: u32 = 6;

/// Rounds a quantity for display, to 4 decimal places (or 6 for values below 10^-3)
///
/// With `adjust_exponent`, a value outside of [10^-3, 10^3) first has its leading unit stepped one prefix along the
/// ladder (so `0.000819 mol` becomes `0.8186 mmol`), then is rounded. Any uncertainty is scaled and rounded with it.
pub fn handle_rounding(
    db: &UnitDatabase,
    quantity: &Quantity,
    adjust_exponent: bool,
) -> Result<Quantity> {
    let mut value = quantity.to_unit(db)?;
    let mut uncertainty = quantity
        .uncertainty
        .map(|u| Unit::new(db, u, &quantity.unit))
        .transpose()?;

    if adjust_exponent {
        let magnitude = magnitude(value.value());
        let direction = if magnitude < SMALL_MAGNITUDE {
            Some(Direction::Down)
        } else if magnitude >= LARGE_MAGNITUDE {
            Some(Direction::Up)
        } else {
            None
        };

        // NOTE: Shrinking a prefix in the denominator grows the value, so those components step the other way
        let leading_exponent = value.sub_units().first().map(|u| u.exponent());
        if let (Some(direction), Some(exponent)) = (direction, leading_exponent) {
            let direction = if exponent < 0 {
                direction.reverse()
            } else {
                direction
            };
            if value.scale_leading_to_next(direction)? {
                if let Some(uncertainty) = &mut uncertainty {
                    uncertainty.scale_leading_to_next(direction)?;
                }
            }
        }
    }

    let places = if magnitude(value.value()) <= SMALL_MAGNITUDE {
        SMALL_PLACES
    } else {
        DEFAULT_PLACES
    };
    let round = |d: Decimal| d.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);

    let rounded = Quantity {
        value: round(value.value()),
        unit: value.unit(),
        uncertainty: uncertainty.map(|u| round(u.value())),
    };
    trace!(from = %quantity, to = %rounded, "rounded quantity");
    Ok(rounded)
}

/// The power of ten of a value's leading digit: 2 for `123.4`, -4 for `0.000818`, and 0 for zero
fn magnitude(value: Decimal) -> i64 {
    let digits = value
        .mantissa()
        .unsigned_abs()
        .checked_ilog10()
        .map_or(0, i64::from);
    if value.is_zero() {
        0
    } else {
        digits - i64::from(value.scale())
    }
}
