use derive_more::IsVariant;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type Result<T, E = Box<QuantityError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error, IsVariant)]
pub enum QuantityError {
    #[diagnostic(help(
        "units are written as <prefix><base>[^exponent] and joined by '*', like mg, mol*L^-1, or s^-1"
    ))]
    #[error("could not interpret {token:?} as a unit")]
    MalformedUnit {
        #[source_code]
        input: String,
        #[label("expected a unit symbol, optionally followed by a non-zero ^exponent")]
        span: SourceSpan,
        token: String,
    },

    #[diagnostic(help("double-check for typos, or add a new entry to the unit database"))]
    #[error("{token:?} does not match any known combination of prefix and base")]
    UnknownUnit {
        #[source_code]
        input: String,
        #[label("unknown unit")]
        span: SourceSpan,
        token: String,
    },

    #[diagnostic(help("double-check for typos, or add a new entry to the unit database"))]
    #[error("the prefix {0:?} could not be found in the supplied unit database")]
    UnknownPrefix(String),

    #[error("cannot use {from} as {to}, since {reason}")]
    IncompatibleUnits {
        from: String,
        to: String,
        reason: &'static str,
    },

    #[diagnostic(help(
        "compound units can only be rescaled between prefixes: both sides need the same bases and exponents, listed in \
        the same order"
    ))]
    #[error("cannot convert {from} into {to}, since {reason}")]
    InvalidConversion {
        from: String,
        to: String,
        reason: &'static str,
    },

    #[error("cannot invert {0}, since its value is zero")]
    ZeroInverse(String),

    #[error("rescaling {0} overflows a 96-bit decimal")]
    Overflow(String),
}

impl QuantityError {
    pub(crate) fn malformed_unit(input: &str, offset: usize, token: &str) -> Self {
        Self::MalformedUnit {
            input: input.to_owned(),
            span: (offset, token.len()).into(),
            token: token.to_owned(),
        }
    }

    pub(crate) fn unknown_unit(input: &str, offset: usize, token: &str) -> Self {
        Self::UnknownUnit {
            input: input.to_owned(),
            span: (offset, token.len()).into(),
            token: token.to_owned(),
        }
    }

    pub(crate) fn unknown_prefix(prefix: &str) -> Self {
        Self::UnknownPrefix(prefix.to_owned())
    }

    pub(crate) fn overflow(unit: impl ToString) -> Self {
        Self::Overflow(unit.to_string())
    }

    pub(crate) fn incompatible_units(
        from: impl ToString,
        to: impl ToString,
        reason: &'static str,
    ) -> Self {
        Self::IncompatibleUnits {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        }
    }

    pub(crate) fn invalid_conversion(
        from: impl ToString,
        to: impl ToString,
        reason: &'static str,
    ) -> Self {
        Self::InvalidConversion {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        }
    }

    /// Both malformed and unrecognised unit tokens are parse errors
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::MalformedUnit { .. } | Self::UnknownUnit { .. })
    }
}
