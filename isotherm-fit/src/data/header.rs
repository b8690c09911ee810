//! Grammar for CSV column headers: `<quantity> [<species>] [[<unit>]]`,
//! e.g. `fugacity CH4 [kPa]`, `Q [mmol/g]` or `T`.

use winnow::{
    Result as WResult,
    ascii::{Caseless, space0, space1},
    combinator::{alt, delimited, eof, opt, preceded},
    prelude::*,
    token::take_while,
};

use crate::DataError;

/// What a column measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantity {
    Pressure,
    Fugacity,
    Loading,
    Temperature,
    /// Row labels naming the species, for long-format files.
    Species,
}

impl Quantity {
    fn parse(i: &mut &str) -> WResult<Self> {
        // Long names first, so `pressure` isn't read as `p` followed by junk.
        alt((
            Caseless("pressure").value(Self::Pressure),
            Caseless("fugacity").value(Self::Fugacity),
            Caseless("loading").value(Self::Loading),
            Caseless("temperature").value(Self::Temperature),
            Caseless("species").value(Self::Species),
            Caseless("p").value(Self::Pressure),
            Caseless("f").value(Self::Fugacity),
            Caseless("q").value(Self::Loading),
            Caseless("t").value(Self::Temperature),
        ))
        .parse_next(i)
    }
}

/// A parsed column header.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Header {
    pub quantity: Quantity,
    pub species: Option<String>,
    pub unit: Option<String>,
}

impl Header {
    pub fn parse(i: &mut &str) -> WResult<Self> {
        ignore_ws(i);
        let quantity = Quantity::parse(i)?;
        let species = opt(preceded(space1, species_name)).parse_next(i)?;
        let unit = opt(preceded(space0, unit)).parse_next(i)?;
        ignore_ws(i);
        eof.parse_next(i)?;
        Ok(Self {
            quantity,
            species: species.map(str::to_owned),
            unit: unit.map(|u| u.trim().to_owned()),
        })
    }

    /// Does this column describe the given species?
    pub fn is_for(&self, species: Option<&str>) -> bool {
        match (&self.species, species) {
            (Some(ours), Some(theirs)) => ours.eq_ignore_ascii_case(theirs),
            (None, None) => true,
            _ => false,
        }
    }

    /// Factor and offset converting this column's values into Pa or K.
    /// Loadings are kept in whatever unit they came in.
    pub fn conversion(&self, raw: &str) -> Result<(f64, f64), DataError> {
        let unknown = |unit: &str| DataError::UnknownUnit {
            header: raw.to_owned(),
            unit: unit.to_owned(),
        };
        match (self.quantity, self.unit.as_deref()) {
            (Quantity::Pressure | Quantity::Fugacity, None) => Ok((1.0, 0.0)),
            (Quantity::Pressure | Quantity::Fugacity, Some(unit)) => {
                pressure_factor(unit).map(|k| (k, 0.0)).ok_or_else(|| unknown(unit))
            }
            (Quantity::Temperature, None) => Ok((1.0, 0.0)),
            (Quantity::Temperature, Some(unit)) => {
                kelvin_offset(unit).map(|c| (1.0, c)).ok_or_else(|| unknown(unit))
            }
            (Quantity::Loading | Quantity::Species, _) => Ok((1.0, 0.0)),
        }
    }
}

/// Pascals per unit.
fn pressure_factor(unit: &str) -> Option<f64> {
    let factor = match unit.to_ascii_lowercase().as_str() {
        "pa" => 1.0,
        "kpa" => 1e3,
        "mpa" => 1e6,
        "bar" => 1e5,
        "atm" => 101_325.0,
        _ => return None,
    };
    Some(factor)
}

/// Kelvins to add to a reading in this unit.
fn kelvin_offset(unit: &str) -> Option<f64> {
    match unit.to_lowercase().as_str() {
        "k" => Some(0.0),
        "c" | "°c" => Some(273.15),
        _ => None,
    }
}

fn species_name<'i>(i: &mut &'i str) -> WResult<&'i str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != '[').parse_next(i)
}

fn unit<'i>(i: &mut &'i str) -> WResult<&'i str> {
    delimited('[', take_while(1.., |c: char| c != ']'), ']').parse_next(i)
}

fn ignore_ws(i: &mut &str) {
    let _: WResult<&str> = space0.parse_next(i);
}

impl std::str::FromStr for Header {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Header::parse.parse(s).map_err(|e| e.to_string())
    }
}
