// Standard Library Imports
use std::collections::hash_map::Entry;

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use knus::Decode;
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

// Local Crate Imports
use crate::{Base, Direction, Prefix};

pub const DEFAULT_KDL: &str = include_str!("../unit_database.kdl");

const BASE_PREFIX: &str = "base";

// Public API ==========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct UnitDatabase {
    prefixes: HashMap<String, Prefix>,
    bases: HashMap<String, Base>,
}

impl UnitDatabase {
    pub fn new(
        file_name: impl AsRef<str>,
        kdl_text: impl AsRef<str>,
    ) -> Result<Self, UnitDatabaseError> {
        let parsed_db: UnitDatabaseKdl = knus::parse(file_name.as_ref(), kdl_text.as_ref())?;
        let db = parsed_db.validate()?;
        debug!(
            prefixes = db.prefixes.len(),
            bases = db.bases.len(),
            "loaded unit database"
        );
        Ok(db)
    }

    /// Looks a prefix up by its symbol (`"k"`) or its name (`"kilo"`). The empty prefix is called `"base"`
    #[must_use]
    pub fn prefix(&self, symbol_or_name: &str) -> Option<&Prefix> {
        self.prefixes
            .get(symbol_or_name)
            .or_else(|| self.prefixes.values().find(|p| p.name == symbol_or_name))
    }

    #[must_use]
    pub fn base_prefix(&self) -> &Prefix {
        // SAFETY: Validation always inserts the empty prefix, so this can never fail
        &self.prefixes[""]
    }

    #[must_use]
    pub fn base(&self, symbol: &str) -> Option<&Base> {
        self.bases.get(symbol)
    }

    /// The canonical base of the same dimension: `s` for `min` and `g` for `g`
    #[must_use]
    pub fn canonical_base(&self, base: &Base) -> &Base {
        // SAFETY: Validation ensures that every origin names a canonical base in this database
        &self.bases[&base.origin]
    }

    /// The closest prefix on the scaling ladder strictly above (or below) `current`, if there is one
    #[must_use]
    pub fn next_prefix(&self, current: &Prefix, direction: Direction) -> Option<&Prefix> {
        let ladder = self.prefixes.values().filter(|p| p.on_ladder());
        match direction {
            Direction::Up => ladder
                .filter(|p| p.exponent > current.exponent)
                .min_by_key(|p| p.exponent),
            Direction::Down => ladder
                .filter(|p| p.exponent < current.exponent)
                .max_by_key(|p| p.exponent),
        }
    }

    /// Splits a unit symbol (without exponent) into its prefix and base
    ///
    /// A bare base always wins over a prefixed reading, so `min` is minutes (and not milli-inches), while `mm` is
    /// millimeters and `m` on its own is meters.
    #[must_use]
    pub fn resolve(&self, symbol: &str) -> Option<(&Prefix, &Base)> {
        if let Some(base) = self.bases.get(symbol) {
            return Some((self.base_prefix(), base));
        }

        self.prefixes
            .values()
            .filter(|p| !p.symbol.is_empty())
            .filter_map(|p| {
                let rest = symbol.strip_prefix(&p.symbol)?;
                self.bases.get(rest).map(|base| (p, base))
            })
            .max_by_key(|(p, _)| p.symbol.len())
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &Prefix> {
        self.prefixes.values()
    }

    pub fn bases(&self) -> impl Iterator<Item = &Base> {
        self.bases.values()
    }
}

impl Default for UnitDatabase {
    fn default() -> Self {
        // SAFETY: The bundled database is covered by the tests below, so it must always load
        Self::new("unit_database.kdl", DEFAULT_KDL).unwrap()
    }
}

#[derive(Debug, Diagnostic, Error)]
pub enum UnitDatabaseError {
    #[error(transparent)]
    Kdl(#[from] knus::Error),

    #[error("the prefix {0:?} is defined more than once")]
    DuplicatePrefix(String),

    #[error("the base {0:?} is defined more than once")]
    DuplicateBase(String),

    #[diagnostic(help("symbols must be non-empty and made up of letters only"))]
    #[error("{0:?} is not a valid unit symbol")]
    InvalidSymbol(String),

    #[diagnostic(help("the empty prefix ({BASE_PREFIX:?}) is built in, so just remove this entry"))]
    #[error("the prefix {0:?} has an exponent of zero")]
    ZeroPrefix(String),

    #[diagnostic(help("the name {BASE_PREFIX:?} is reserved for the empty prefix"))]
    #[error("the prefix {0:?} can't be named {BASE_PREFIX:?}")]
    ReservedName(String),

    #[diagnostic(help("every origin must also be listed as a base"))]
    #[error("the base {0:?} refers to the unknown origin {1:?}")]
    UnknownOrigin(String, String),

    #[diagnostic(help("an origin must be its own origin, with a factor of 1"))]
    #[error("the base {0:?} has the origin {1:?}, which is not a canonical base")]
    NonCanonicalOrigin(String, String),

    #[error("the canonical base {0:?} must have a factor of 1, but has a factor of {1}")]
    CanonicalFactor(String, Decimal),

    #[error("the base {0:?} must have a positive factor, but has a factor of {1}")]
    NonPositiveFactor(String, Decimal),
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct UnitDatabaseKdl {
    #[knus(child, unwrap(children))]
    prefixes: Vec<PrefixKdl>,
    #[knus(child, unwrap(children))]
    bases: Vec<BaseKdl>,
}

#[derive(Debug, Decode)]
struct PrefixKdl {
    #[knus(node_name)]
    symbol: String,
    #[knus(argument)]
    name: String,
    #[knus(argument)]
    exponent: i32,
}

#[derive(Debug, Decode)]
struct BaseKdl {
    #[knus(node_name)]
    symbol: String,
    #[knus(argument)]
    name: String,
    #[knus(property)]
    origin: String,
    #[knus(property, str)]
    factor: Decimal,
}

// Validation of the Parsed KDL ========================================================================================

impl UnitDatabaseKdl {
    fn validate(self) -> Result<UnitDatabase, UnitDatabaseError> {
        let mut prefixes = HashMap::new();
        prefixes.insert(
            String::new(),
            Prefix {
                symbol: String::new(),
                name: BASE_PREFIX.to_owned(),
                exponent: 0,
            },
        );
        for PrefixKdl {
            symbol,
            name,
            exponent,
        } in self.prefixes
        {
            check_symbol(&symbol)?;
            if exponent == 0 {
                return Err(UnitDatabaseError::ZeroPrefix(symbol));
            }
            if name == BASE_PREFIX {
                return Err(UnitDatabaseError::ReservedName(symbol));
            }
            match prefixes.entry(symbol.clone()) {
                Entry::Occupied(_) => return Err(UnitDatabaseError::DuplicatePrefix(symbol)),
                Entry::Vacant(e) => {
                    e.insert(Prefix {
                        symbol,
                        name,
                        exponent,
                    });
                }
            }
        }

        let mut bases = HashMap::new();
        for BaseKdl {
            symbol,
            name,
            origin,
            factor,
        } in self.bases
        {
            check_symbol(&symbol)?;
            if factor <= Decimal::ZERO {
                return Err(UnitDatabaseError::NonPositiveFactor(symbol, factor));
            }
            if symbol == origin && factor != Decimal::ONE {
                return Err(UnitDatabaseError::CanonicalFactor(symbol, factor));
            }
            match bases.entry(symbol.clone()) {
                Entry::Occupied(_) => return Err(UnitDatabaseError::DuplicateBase(symbol)),
                Entry::Vacant(e) => {
                    e.insert(Base {
                        symbol,
                        name,
                        origin,
                        factor,
                    });
                }
            }
        }

        // NOTE: Origins can only be checked once every base has been collected, since they might be listed in any order
        for base in bases.values() {
            match bases.get(&base.origin) {
                None => {
                    return Err(UnitDatabaseError::UnknownOrigin(
                        base.symbol.clone(),
                        base.origin.clone(),
                    ));
                }
                Some(origin) if !origin.is_canonical() => {
                    return Err(UnitDatabaseError::NonCanonicalOrigin(
                        base.symbol.clone(),
                        base.origin.clone(),
                    ));
                }
                Some(_) => (),
            }
        }

        Ok(UnitDatabase { prefixes, bases })
    }
}

fn check_symbol(symbol: &str) -> Result<(), UnitDatabaseError> {
    if !symbol.is_empty() && symbol.chars().all(char::is_alphabetic) {
        Ok(())
    } else {
        Err(UnitDatabaseError::InvalidSymbol(symbol.to_owned()))
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use indoc::indoc;
    use rust_decimal_macros::dec;

    use super::*;

    static DB: LazyLock<UnitDatabase> = LazyLock::new(UnitDatabase::default);

    #[test]
    fn parse_default_unit_database() {
        let db: UnitDatabaseKdl = knus::parse("unit_database.kdl", DEFAULT_KDL).unwrap();
        assert_eq!(db.prefixes.len(), 10);
        assert_eq!(db.bases.len(), 14);
        // The empty prefix is added during validation
        assert_eq!(DB.prefixes().count(), 11);
        assert_eq!(DB.bases().count(), 14);
    }

    #[test]
    fn lookup_prefixes() {
        assert_eq!(DB.prefix("k").unwrap().exponent(), 3);
        assert_eq!(DB.prefix("kilo").unwrap().symbol(), "k");
        assert_eq!(DB.prefix("base").unwrap().symbol(), "");
        assert_eq!(DB.prefix("").unwrap().name(), "base");
        assert_eq!(DB.base_prefix().exponent(), 0);
        assert_eq!(DB.prefix("x"), None);
    }

    #[test]
    fn lookup_bases() {
        let minute = DB.base("min").unwrap();
        assert_eq!(minute.name(), "minute");
        assert_eq!(minute.factor(), dec!(60));
        assert!(!minute.is_canonical());
        assert_eq!(DB.canonical_base(minute).symbol(), "s");

        let calorie = DB.base("cal").unwrap();
        assert_eq!(calorie.factor(), dec!(4.184));
        assert_eq!(DB.canonical_base(calorie).symbol(), "J");

        let gram = DB.base("g").unwrap();
        assert!(gram.is_canonical());
        assert_eq!(DB.canonical_base(gram), gram);
    }

    #[test]
    fn prefix_ladder() {
        let step = |symbol, direction| {
            DB.next_prefix(DB.prefix(symbol).unwrap(), direction)
                .map(Prefix::symbol)
        };
        assert_eq!(step("m", Direction::Up), Some(""));
        assert_eq!(step("", Direction::Up), Some("k"));
        assert_eq!(step("k", Direction::Down), Some(""));
        assert_eq!(step("", Direction::Down), Some("m"));
        assert_eq!(step("u", Direction::Up), Some("m"));
        // Off-ladder prefixes step onto the closest rung
        assert_eq!(step("c", Direction::Up), Some(""));
        assert_eq!(step("c", Direction::Down), Some("m"));
        assert_eq!(step("d", Direction::Up), Some(""));
        // The ends of the ladder
        assert_eq!(step("G", Direction::Up), None);
        assert_eq!(step("f", Direction::Down), None);
    }

    #[test]
    fn resolve_symbols() {
        let resolve = |symbol| {
            DB.resolve(symbol)
                .map(|(p, b)| (p.symbol().to_owned(), b.symbol().to_owned()))
        };
        let pair = |p: &str, b: &str| Some((p.to_owned(), b.to_owned()));
        assert_eq!(resolve("m"), pair("", "m"));
        assert_eq!(resolve("mm"), pair("m", "m"));
        assert_eq!(resolve("min"), pair("", "min"));
        assert_eq!(resolve("mmin"), pair("m", "min"));
        assert_eq!(resolve("mol"), pair("", "mol"));
        assert_eq!(resolve("mmol"), pair("m", "mol"));
        assert_eq!(resolve("kg"), pair("k", "g"));
        assert_eq!(resolve("mL"), pair("m", "L"));
        assert_eq!(resolve("kPa"), pair("k", "Pa"));
        assert_eq!(resolve("cal"), pair("", "cal"));
        assert_eq!(resolve("kcal"), pair("k", "cal"));
        assert_eq!(resolve("K"), pair("", "K"));
        assert_eq!(resolve("kK"), pair("k", "K"));
        assert_eq!(resolve("q"), None);
        assert_eq!(resolve("kq"), None);
        assert_eq!(resolve("k"), None);
    }

    #[test]
    fn duplicate_entries() {
        let kdl = indoc! {r#"
            prefixes {
                k "kilo" 3
                k "kilo" 3
            }
            bases {
                g "gram" origin="g" factor="1"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::DuplicatePrefix(p)) if p == "k"));

        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                g "gram" origin="g" factor="1"
                g "grain" origin="g" factor="1"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::DuplicateBase(b)) if b == "g"));
    }

    #[test]
    fn invalid_prefixes() {
        let kdl = indoc! {r#"
            prefixes {
                u "unit" 0
            }
            bases {
                g "gram" origin="g" factor="1"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::ZeroPrefix(p)) if p == "u"));

        let kdl = indoc! {r#"
            prefixes {
                b "base" 3
            }
            bases {
                g "gram" origin="g" factor="1"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::ReservedName(p)) if p == "b"));

        let kdl = indoc! {r#"
            prefixes {
                "k2" "kilo" 3
            }
            bases {
                g "gram" origin="g" factor="1"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::InvalidSymbol(p)) if p == "k2"));
    }

    #[test]
    fn invalid_origins() {
        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                min "minute" origin="s" factor="60"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::UnknownOrigin(b, o)) if b == "min" && o == "s"));

        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                s "second" origin="s" factor="1"
                min "minute" origin="s" factor="60"
                h "hour" origin="min" factor="60"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::NonCanonicalOrigin(b, o)) if b == "h" && o == "min"));
    }

    #[test]
    fn invalid_factors() {
        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                s "second" origin="s" factor="2"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::CanonicalFactor(b, f)) if b == "s" && f == dec!(2)));

        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                s "second" origin="s" factor="1"
                min "minute" origin="s" factor="-60"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::NonPositiveFactor(b, _)) if b == "min"));
    }

    #[test]
    fn malformed_kdl() {
        let kdl = indoc! {r#"
            prefixes {
                k "kilo" "three"
            }
            bases {
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::Kdl(_))));

        let kdl = indoc! {r#"
            prefixes {
            }
            bases {
                g "gram" origin="g" factor="one"
            }
        "#};
        let res = UnitDatabase::new("test", kdl);
        assert!(matches!(res, Err(UnitDatabaseError::Kdl(_))));
    }
}
