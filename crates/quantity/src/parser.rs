use nom::{
    IResult,
    character::complete::{alpha1, char, i32},
    combinator::{all_consuming, opt},
    sequence::{pair, preceded},
};

use crate::{BaseUnit, QuantityError, Result, UnitDatabase};

/// Unit = Unit Token , { "*" , Unit Token } ;
pub fn unit<'u>(db: &'u UnitDatabase, input: &str) -> Result<Vec<BaseUnit<'u>>> {
    let mut offset = 0;
    let mut sub_units = Vec::new();
    for token in input.split('*') {
        let leading = token.len() - token.trim_start().len();
        sub_units.push(base_unit(db, input, offset + leading, token.trim())?);
        offset += token.len() + 1;
    }
    Ok(sub_units)
}

/// Parses a single unit token, reporting any errors against the wider `input` it was taken from
pub fn base_unit<'u>(
    db: &'u UnitDatabase,
    input: &str,
    offset: usize,
    token: &str,
) -> Result<BaseUnit<'u>> {
    let Ok((_, (symbol, exponent))) = unit_token(token) else {
        return Err(QuantityError::malformed_unit(input, offset, token).into());
    };
    let exponent = exponent.unwrap_or(1);
    if exponent == 0 {
        return Err(QuantityError::malformed_unit(input, offset, token).into());
    }

    let (prefix, base) = db
        .resolve(symbol)
        .ok_or_else(|| QuantityError::unknown_unit(input, offset, symbol))?;
    Ok(BaseUnit::new(db, prefix, base, exponent))
}

/// Unit Token = letter , { letter } , [ "^" , [ "-" ] , digit , { digit } ] ;
fn unit_token(i: &str) -> IResult<&str, (&str, Option<i32>)> {
    all_consuming(pair(alpha1, opt(preceded(char('^'), i32))))(i)
}
