use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;

use crate::{Quantity, Result, Unit, UnitDatabase};

impl Quantity {
    pub fn new(value: Decimal, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
            uncertainty: None,
        }
    }

    #[must_use]
    pub fn with_uncertainty(mut self, uncertainty: Decimal) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    pub fn to_unit<'u>(&self, db: &'u UnitDatabase) -> Result<Unit<'u>> {
        Unit::from_quantity(db, self)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(uncertainty) = self.uncertainty {
            write!(f, " ± {uncertainty}")?;
        }
        write!(f, " {}", self.unit)
    }
}
