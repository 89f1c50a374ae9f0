use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{PipelineError, Result};

/// A raw CSV table held as headers plus string rows. All typed parsing
/// happens downstream in the source readers, so schema problems surface
/// against named columns rather than positional indexes.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub file: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Load a CSV file with a header row.
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            PipelineError::Config(format!("cannot open input file '{file_name}': {e}"))
        })?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self {
            file: file_name,
            headers,
            rows,
        })
    }

    /// Index of a required column; absence is a schema failure.
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PipelineError::schema(&self.file, format!("missing column '{name}'")))
    }

    /// Cell accessor tolerant of short rows (flexible CSV).
    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// One output row of an unpivot: the id-column values, the name of the value
/// column it came from, and the cell content.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpivotedRow {
    pub id_values: Vec<String>,
    pub column: String,
    pub value: String,
}

/// Reshape a wide table (calendar or year columns) into long rows: one
/// output row per (input row, matched value column). The id columns must all
/// exist; matching zero value columns is a schema failure, since it means
/// the grid the caller expected is not there.
pub fn unpivot(
    table: &RawTable,
    id_columns: &[&str],
    mut is_value_column: impl FnMut(&str) -> bool,
) -> Result<Vec<UnpivotedRow>> {
    let id_idx: Vec<usize> = id_columns
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<_>>()?;

    let value_idx: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| !id_idx.contains(i) && is_value_column(h))
        .map(|(i, _)| i)
        .collect();

    if value_idx.is_empty() {
        return Err(PipelineError::schema(
            &table.file,
            "unpivot matched zero value columns",
        ));
    }

    let mut out = Vec::with_capacity(table.rows.len() * value_idx.len());
    for row in &table.rows {
        let id_values: Vec<String> = id_idx
            .iter()
            .map(|&i| table.cell(row, i).to_string())
            .collect();
        for &vi in &value_idx {
            out.push(UnpivotedRow {
                id_values: id_values.clone(),
                column: table.headers[vi].clone(),
                value: table.cell(row, vi).to_string(),
            });
        }
    }
    Ok(out)
}

/// Inner-join two keyed maps of per-year values, preferring the second
/// source wherever both report the same year. Keys present in only one
/// input are dropped. This is the explicit overlap-resolution merge for the
/// two population extracts.
pub fn merge_prefer_second<K: Ord + Clone>(
    first: &BTreeMap<K, BTreeMap<i32, f64>>,
    second: &BTreeMap<K, BTreeMap<i32, f64>>,
) -> BTreeMap<K, BTreeMap<i32, f64>> {
    let mut merged = BTreeMap::new();
    for (key, first_years) in first {
        if let Some(second_years) = second.get(key) {
            let mut years = first_years.clone();
            for (year, value) in second_years {
                years.insert(*year, *value);
            }
            merged.insert(key.clone(), years);
        }
    }
    merged
}
