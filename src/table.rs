//! Column-oriented observation table handed to the slicer.
//!
//! Every column has the same length; numeric columns are `ndarray` arrays so
//! metrics can use vectorized reductions over the selected rows.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use ndarray::Array1;

use crate::error::{Result, SlicerError};

/// One homogeneous column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float(Array1<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Float(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ordered observation records stored column-wise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationTable {
    columns: BTreeMap<String, Column>,
    nrows: usize,
}

impl ObservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a column. The first column fixes the row count.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        let replacing_only = self.columns.len() == 1 && self.columns.contains_key(&name);
        if !self.columns.is_empty() && !replacing_only && column.len() != self.nrows {
            return Err(SlicerError::InvalidInput(format!(
                "column '{name}' has {} rows, table has {}",
                column.len(),
                self.nrows
            )));
        }
        self.nrows = column.len();
        self.columns.insert(name, column);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for a numeric column.
    pub fn with_float(mut self, name: impl Into<String>, values: impl Into<Array1<f64>>) -> Result<Self> {
        self.insert(name, Column::Float(values.into()))?;
        Ok(self)
    }

    /// Builder-style [`insert`](Self::insert) for a text column.
    pub fn with_text(mut self, name: impl Into<String>, values: Vec<String>) -> Result<Self> {
        self.insert(name, Column::Text(values))?;
        Ok(self)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.nrows
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .get(name)
            .ok_or_else(|| SlicerError::MissingColumn(name.to_string()))
    }

    /// A numeric column by name.
    pub fn float(&self, name: &str) -> Result<&Array1<f64>> {
        match self.column(name)? {
            Column::Float(values) => Ok(values),
            Column::Text(_) => Err(SlicerError::ColumnType {
                name: name.to_string(),
                expected: "numeric",
            }),
        }
    }

    /// A text column by name.
    pub fn text(&self, name: &str) -> Result<&[String]> {
        match self.column(name)? {
            Column::Text(values) => Ok(values.as_slice()),
            Column::Float(_) => Err(SlicerError::ColumnType {
                name: name.to_string(),
                expected: "text",
            }),
        }
    }

    /// Check that every named column exists and is numeric.
    pub fn require_float_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        names.iter().try_for_each(|n| self.float(n.as_ref()).map(|_| ()))
    }

    /// Load a table from CSV with a header row.
    ///
    /// A column is numeric if every one of its cells parses as `f64`,
    /// otherwise it is kept as text.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for record in rdr.records() {
            let record = record?;
            for (col, value) in cells.iter_mut().zip(record.iter()) {
                col.push(value.to_string());
            }
        }

        let mut table = Self::new();
        for (name, raw) in headers.into_iter().zip(cells) {
            let parsed: Option<Vec<f64>> = raw.iter().map(|s| s.parse().ok()).collect();
            let column = match parsed {
                Some(values) => Column::Float(Array1::from(values)),
                None => Column::Text(raw),
            };
            table.insert(name, column)?;
        }
        Ok(table)
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(std::io::BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_and_lookup() {
        let table = ObservationTable::new()
            .with_float("fieldRA", vec![0.0, 1.0, 2.0])
            .unwrap()
            .with_text("filter", vec!["r".into(), "g".into(), "i".into()])
            .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.float("fieldRA").unwrap()[2], 2.0);
        assert_eq!(table.text("filter").unwrap()[1], "g");
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["fieldRA", "filter"]);
    }

    #[test]
    fn mismatched_column_length_is_rejected() {
        let err = ObservationTable::new()
            .with_float("a", vec![1.0, 2.0])
            .unwrap()
            .with_float("b", vec![1.0])
            .unwrap_err();
        assert!(matches!(err, SlicerError::InvalidInput(_)));
    }

    #[test]
    fn single_column_can_be_replaced() {
        let mut table = ObservationTable::new().with_float("a", vec![1.0, 2.0]).unwrap();
        table.insert("a", Column::Float(Array1::from(vec![3.0]))).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn missing_and_mistyped_columns() {
        let table = ObservationTable::new()
            .with_text("filter", vec!["r".into()])
            .unwrap();

        assert!(matches!(table.float("fieldRA"), Err(SlicerError::MissingColumn(_))));
        assert!(matches!(table.float("filter"), Err(SlicerError::ColumnType { .. })));
        assert!(table.require_float_columns(&["filter"]).is_err());
    }

    #[test]
    fn csv_infers_column_types() {
        let data = "fieldRA, fieldDec, filter\n10.0, -5.0, r\n11.5, -6.0, g\n";
        let table = ObservationTable::from_csv_reader(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.float("fieldDec").unwrap().to_vec(), vec![-5.0, -6.0]);
        assert_eq!(table.text("filter").unwrap(), &["r".to_string(), "g".to_string()]);
        table.require_float_columns(&["fieldRA", "fieldDec"]).unwrap();
    }

    #[test]
    fn csv_with_header_only_is_empty() {
        let table = ObservationTable::from_csv_reader("fieldRA,fieldDec\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert!(table.float("fieldRA").unwrap().is_empty());
    }
}
