//! Coerce-to-null type enforcement for schema columns

use super::SemanticType;
use polars::prelude::*;

/// A coerced column and how many values were lost on the way
#[derive(Debug, Clone)]
pub struct Coerced {
    pub series: Series,
    /// Values that were present before coercion and null after
    pub lost: usize,
}

/// Coerce `series` to `target`. Never fails: anything that cannot be
/// represented becomes null and is counted in [`Coerced::lost`].
pub fn coerce_column(series: &Series, target: SemanticType) -> Coerced {
    let before = series.null_count();
    let coerced = match target {
        SemanticType::Float => to_float(series),
        SemanticType::Int => to_int(series),
        SemanticType::Text => series.clone(),
    };
    let lost = coerced.null_count().saturating_sub(before);
    Coerced {
        series: coerced,
        lost,
    }
}

fn to_float(series: &Series) -> Series {
    let name = series.name().clone();
    match series.dtype() {
        DataType::Float64 => series.clone(),
        DataType::String => match series.str() {
            Ok(ca) => {
                Float64Chunked::from_iter_options(name, ca.into_iter().map(|v| v.and_then(parse_float)))
                    .into_series()
            }
            Err(_) => Series::full_null(name, series.len(), &DataType::Float64),
        },
        _ => series
            .cast(&DataType::Float64)
            .unwrap_or_else(|_| Series::full_null(name, series.len(), &DataType::Float64)),
    }
}

fn to_int(series: &Series) -> Series {
    let name = series.name().clone();
    if series.dtype().is_integer() || series.dtype() == &DataType::Boolean {
        if let Ok(cast) = series.cast(&DataType::Int64) {
            return cast;
        }
    }

    let floats = to_float(series);
    match floats.f64() {
        Ok(ca) => Int64Chunked::from_iter_options(name, ca.into_iter().map(|v| v.and_then(integral)))
            .into_series(),
        Err(_) => Series::full_null(name, series.len(), &DataType::Int64),
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
