pub mod label;

use crate::error::{PipelineError, Result};
use crate::process::date_parser::days_to_date;
use arrow::{
    array::{Array, ArrayRef, BooleanArray, Date32Array, StringArray},
    compute::filter_record_batch,
    datatypes::{Field, Schema},
    record_batch::{RecordBatch, RecordBatchOptions},
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Canonical name of the record identifier column.
pub const IDENTIFIER: &str = "ACN";

/// One value read out of a [`RecordTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell<'a> {
    Text(&'a str),
    Date(NaiveDate),
    Missing,
}

impl<'a> Cell<'a> {
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Cell::Text(s) => Some(*s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// Columns keyed by composite label, all of the same length.
///
/// Backed by an Arrow [`RecordBatch`]: text columns are `Utf8`, the normalized
/// date column is `Date32`, and missing cells are nulls. Every operation
/// returns a new table; batches are immutable, so clones are cheap and safe to
/// hand to concurrent readers.
#[derive(Clone, Debug)]
pub struct RecordTable {
    batch: RecordBatch,
}

impl RecordTable {
    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build a table from `(label, array)` pairs. `row_count` is needed so a
    /// table with no columns still knows how many rows it has.
    pub fn from_columns(columns: Vec<(String, ArrayRef)>, row_count: usize) -> Result<Self> {
        let mut fields = Vec::with_capacity(columns.len());
        let mut arrays = Vec::with_capacity(columns.len());
        for (name, array) in columns {
            if array.len() != row_count {
                return Err(PipelineError::structural(format!(
                    "column '{}' has {} rows, expected {}",
                    name,
                    array.len(),
                    row_count
                )));
            }
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;
        Ok(Self { batch })
    }

    pub fn empty() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
        }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column labels in column order.
    pub fn labels(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.batch.schema().index_of(label).ok()
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    pub fn has_identifier(&self) -> bool {
        self.has_column(IDENTIFIER)
    }

    pub fn column(&self, label: &str) -> Option<&ArrayRef> {
        self.index_of(label).map(|i| self.batch.column(i))
    }

    pub fn text_column(&self, label: &str) -> Option<&StringArray> {
        self.column(label)
            .and_then(|a| a.as_any().downcast_ref::<StringArray>())
    }

    pub fn date_column(&self, label: &str) -> Option<&Date32Array> {
        self.column(label)
            .and_then(|a| a.as_any().downcast_ref::<Date32Array>())
    }

    /// Number of non-missing values in `label`, or `None` if the column is absent.
    pub fn non_null_count(&self, label: &str) -> Option<usize> {
        self.column(label).map(|a| a.len() - a.null_count())
    }

    pub fn cell(&self, row: usize, label: &str) -> Cell<'_> {
        let Some(array) = self.column(label) else {
            return Cell::Missing;
        };
        if row >= array.len() || array.is_null(row) {
            return Cell::Missing;
        }
        if let Some(s) = array.as_any().downcast_ref::<StringArray>() {
            return Cell::Text(s.value(row));
        }
        if let Some(d) = array.as_any().downcast_ref::<Date32Array>() {
            return days_to_date(d.value(row)).map_or(Cell::Missing, Cell::Date);
        }
        Cell::Missing
    }

    /// Text values of the identifier column in row order (missing values are skipped).
    pub fn identifiers(&self) -> Vec<String> {
        self.text_column(IDENTIFIER)
            .map(|ids| ids.iter().flatten().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Keep the columns at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> Result<Self> {
        Ok(Self {
            batch: self.batch.project(indices)?,
        })
    }

    /// Project onto `indices`, appending the identifier column when the
    /// source has one and the projection left it out. Every subsetting stage
    /// goes through here so derived tables stay identifier-filterable.
    pub fn project_preserving_identifier(&self, indices: &[usize]) -> Result<Self> {
        let mut indices = indices.to_vec();
        if let Some(id_idx) = self.index_of(IDENTIFIER) {
            if !indices.contains(&id_idx) {
                indices.push(id_idx);
            }
        }
        self.project(&indices)
    }

    /// Drop every column named in `labels`; unknown labels are ignored.
    pub fn drop_columns(&self, labels: &[String]) -> Result<Self> {
        let keep: Vec<usize> = self
            .batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| !labels.contains(f.name()))
            .map(|(i, _)| i)
            .collect();
        self.project(&keep)
    }

    /// Keep the rows where `mask` is true. Null mask entries count as false.
    pub fn select_rows(&self, mask: &BooleanArray) -> Result<Self> {
        if mask.len() != self.num_rows() {
            return Err(PipelineError::structural(format!(
                "row mask has {} entries for a table of {} rows",
                mask.len(),
                self.num_rows()
            )));
        }
        Ok(Self {
            batch: filter_record_batch(&self.batch, mask)?,
        })
    }

    /// Replace the column `label` if present, otherwise append it.
    pub fn with_column(&self, label: &str, array: ArrayRef) -> Result<Self> {
        let mut columns: Vec<(String, ArrayRef)> = self
            .batch
            .schema()
            .fields()
            .iter()
            .zip(self.batch.columns())
            .map(|(f, a)| (f.name().clone(), a.clone()))
            .collect();
        match columns.iter_mut().find(|(name, _)| name == label) {
            Some(slot) => slot.1 = array,
            None => columns.push((label.to_string(), array)),
        }
        Self::from_columns(columns, self.num_rows())
    }
}

impl PartialEq for RecordTable {
    fn eq(&self, other: &Self) -> bool {
        self.batch == other.batch
    }
}

/// Build a `Utf8` column from optional string values.
pub fn text_array<I, S>(values: I) -> ArrayRef
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    Arc::new(StringArray::from_iter(values)) as ArrayRef
}
