//! Loading observations from CSV files.
//!
//! Every column header names a quantity, optionally a species and a unit,
//! e.g. `P [bar]`, `fugacity CH4 [kPa]` or `Q H2S [mmol/g]`.
//! Pressures and fugacities are converted to Pa and temperatures to K.
//! Loadings stay in the file's unit.
//!
//! Unary data can either be in its own file, or in a long-format file
//! with a `species` column labelling each row.

use std::{io::Read, path::Path};

use indexmap::IndexMap;
use winnow::Parser;

use crate::{BinaryObservations, DataError, UNARY_FUGACITY_THRESHOLD, UnaryObservations};

mod header;

use header::{Header, Quantity};

/// One numeric column, already in SI units.
#[derive(Debug, Clone)]
struct Column {
    header: Header,
    values: Vec<f64>,
}

/// A CSV table of observations, not yet interpreted as unary or binary data.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Keyed by the raw header text.
    columns: IndexMap<String, Column>,
    /// Contents of the `species` column, if there was one.
    labels: Option<Vec<String>>,
}

impl Dataset {
    /// Read a CSV file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read CSV text, e.g. from stdin.
    pub fn from_reader(reader: impl Read) -> Result<Self, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut headers = Vec::new();
        for raw in reader.headers()?.iter() {
            let header = Header::parse
                .parse(raw)
                .map_err(|_| DataError::Header {
                    header: raw.to_owned(),
                })?;
            let conversion = header.conversion(raw)?;
            headers.push((raw.to_owned(), header, conversion));
        }
        let mut columns: IndexMap<String, Column> = IndexMap::with_capacity(headers.len());
        let mut labels = None;
        let mut label_index = None;
        for (index, (raw, header, _)) in headers.iter().enumerate() {
            if header.quantity == Quantity::Species {
                label_index = Some(index);
                labels = Some(Vec::new());
                continue;
            }
            let previous = columns.insert(
                raw.clone(),
                Column {
                    header: header.clone(),
                    values: Vec::new(),
                },
            );
            if previous.is_some() {
                return Err(DataError::DuplicateColumn {
                    header: raw.clone(),
                });
            }
        }

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (index, ((raw, _, (factor, offset)), cell)) in
                headers.iter().zip(record.iter()).enumerate()
            {
                if Some(index) == label_index {
                    if let Some(labels) = labels.as_mut() {
                        labels.push(cell.to_owned());
                    }
                    continue;
                }
                let value: f64 = cell.parse().map_err(|_| DataError::BadValue {
                    row: row + 1,
                    header: raw.clone(),
                    value: cell.to_owned(),
                })?;
                if let Some(column) = columns.get_mut(raw) {
                    column.values.push(value * factor + offset);
                }
            }
        }
        tracing::debug!(
            columns = ?columns.keys().collect::<Vec<_>>(),
            rows = columns.values().next().map(|c| c.values.len()).unwrap_or_default(),
            "read dataset"
        );
        Ok(Self { columns, labels })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns
            .values()
            .next()
            .map(|c| c.values.len())
            .unwrap_or_default()
    }

    /// True if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The species named in column headers or in a `species` column, in order of appearance.
    pub fn species(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let named = self
            .columns
            .values()
            .filter_map(|c| c.header.species.as_ref())
            .chain(self.labels.iter().flatten());
        for name in named {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Unit of the loading columns, if the headers give one.
    pub fn loading_unit(&self) -> Option<&str> {
        self.columns
            .values()
            .find(|c| c.header.quantity == Quantity::Loading)
            .and_then(|c| c.header.unit.as_deref())
    }

    /// Single-component data.
    ///
    /// With a species, uses that species' columns, or the rows labelled with it
    /// in a long-format file. Without one, uses the columns that name no species.
    /// In a mixture file, only the rows where every other species' fugacity is
    /// below [`UNARY_FUGACITY_THRESHOLD`] are kept.
    pub fn unary(&self, species: Option<&str>) -> Result<UnaryObservations, DataError> {
        let labelled = |row: &usize| match (&self.labels, species) {
            (Some(labels), Some(species)) => labels
                .get(*row)
                .is_some_and(|label| label.eq_ignore_ascii_case(species)),
            _ => true,
        };
        let competitors: Vec<&Column> = self
            .columns
            .values()
            .filter(|c| matches!(c.header.quantity, Quantity::Fugacity | Quantity::Pressure))
            .filter(|c| c.header.species.is_some() && !c.header.is_for(species))
            .collect();
        let pure = |row: &usize| {
            competitors
                .iter()
                .all(|c| c.values[*row] < UNARY_FUGACITY_THRESHOLD)
        };
        let rows: Vec<usize> = (0..self.len()).filter(labelled).filter(pure).collect();
        let pick = |column: &Column| rows.iter().map(|&r| column.values[r]).collect();
        let fugacity = self.fugacity_column(species, true)?;
        let loading = self.column(Quantity::Loading, species, true)?;
        let temperature = self.column(Quantity::Temperature, None, false)?;
        Ok(UnaryObservations::new(
            pick(fugacity),
            pick(loading),
            pick(temperature),
        )?)
    }

    /// Two-component data, with columns for each named species.
    pub fn binary(&self, species_i: &str, species_j: &str) -> Result<BinaryObservations, DataError> {
        let fugacity_i = self.fugacity_column(Some(species_i), false)?;
        let fugacity_j = self.fugacity_column(Some(species_j), false)?;
        let loading_i = self.column(Quantity::Loading, Some(species_i), false)?;
        let loading_j = self.column(Quantity::Loading, Some(species_j), false)?;
        let temperature = self.column(Quantity::Temperature, None, false)?;
        Ok(BinaryObservations::new(
            fugacity_i.values.clone(),
            fugacity_j.values.clone(),
            loading_i.values.clone(),
            loading_j.values.clone(),
            temperature.values.clone(),
        )?)
    }

    /// Fugacity if there is one, pressure otherwise.
    fn fugacity_column(
        &self,
        species: Option<&str>,
        allow_unnamed: bool,
    ) -> Result<&Column, DataError> {
        self.column(Quantity::Fugacity, species, allow_unnamed)
            .or_else(|_| self.column(Quantity::Pressure, species, allow_unnamed))
            .map_err(|_| DataError::MissingColumn {
                quantity: "fugacity or pressure",
                species: species.map(str::to_owned),
            })
    }

    /// The column for this quantity and species. With `allow_unnamed`,
    /// a column naming no species stands in for a missing species-specific one.
    /// Temperature columns may always be unnamed.
    fn column(
        &self,
        quantity: Quantity,
        species: Option<&str>,
        allow_unnamed: bool,
    ) -> Result<&Column, DataError> {
        let find = |species: Option<&str>| {
            self.columns
                .values()
                .find(|c| c.header.quantity == quantity && c.header.is_for(species))
        };
        find(species)
            .or_else(|| if allow_unnamed { find(None) } else { None })
            .ok_or_else(|| DataError::MissingColumn {
                quantity: quantity.name(),
                species: species.map(str::to_owned),
            })
    }
}

impl Quantity {
    #[mutants::skip]
    fn name(self) -> &'static str {
        match self {
            Quantity::Pressure => "pressure",
            Quantity::Fugacity => "fugacity",
            Quantity::Loading => "loading",
            Quantity::Temperature => "temperature",
            Quantity::Species => "species",
        }
    }
}
