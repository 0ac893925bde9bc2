//! Small `DataFrame` helpers shared by the validator, cleaner and encoder

use crate::error::Result;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Column names in table order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

/// Whether the dtype holds free text
pub fn is_text(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String)
}

/// Whether the dtype is an integer or float type
pub fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

/// Keep the first occurrence of every distinct row, preserving order.
/// Nulls compare equal to each other.
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}

/// Number of rows that exactly repeat an earlier row
pub fn duplicate_count(df: &DataFrame) -> Result<usize> {
    Ok(df.height() - drop_duplicate_rows(df)?.height())
}

/// Number of distinct non-null values
pub fn distinct_non_null(series: &Series) -> Result<usize> {
    Ok(series.drop_nulls().n_unique()?)
}

/// Distinct non-null values of a text column in lexicographic order
pub fn sorted_categories(series: &Series) -> Result<Vec<String>> {
    let ca = series.str()?;
    let categories: BTreeSet<&str> = ca.into_iter().flatten().collect();
    Ok(categories.into_iter().map(str::to_string).collect())
}

/// Median of the non-null values, `None` when there are none
pub fn median(series: &Series) -> Result<Option<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.median())
}
