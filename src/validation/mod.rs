//! Schema and data-quality gate
//!
//! The validator enforces an expected schema on an incoming table and reports
//! data-quality findings. Only an empty table or missing schema columns abort;
//! every other finding is a warning recorded in the [`ValidationReport`].

mod coercion;
mod validator;

pub use coercion::{coerce_column, Coerced};
pub use validator::{validate, DataValidator, DEFAULT_MIN_ROWS};

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type a schema column is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Stored as `Float64`
    Float,
    /// Stored as `Int64`; non-integral values become null
    Int,
    /// Left as-is
    Text,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Float => write!(f, "float"),
            SemanticType::Int => write!(f, "int"),
            SemanticType::Text => write!(f, "text"),
        }
    }
}

/// Ordered column name → semantic type mapping.
///
/// Every entry must be present in a table entering validation; extra columns
/// are tolerated and passed through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedSchema {
    columns: Vec<(String, SemanticType)>,
}

impl Default for ExpectedSchema {
    fn default() -> Self {
        Self::churn()
    }
}

impl ExpectedSchema {
    /// Empty schema
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Schema of the telco churn export
    pub fn churn() -> Self {
        Self::new()
            .with_column("tenure", SemanticType::Float)
            .with_column("MonthlyCharges", SemanticType::Float)
            .with_column("TotalCharges", SemanticType::Float)
            .with_column("SeniorCitizen", SemanticType::Int)
            .with_column("Churn", SemanticType::Text)
    }

    /// Churn schema with the target renamed
    pub fn churn_with_target(target: &str) -> Self {
        let mut schema = Self::churn();
        for (name, ty) in schema.columns.iter_mut() {
            if *ty == SemanticType::Text && name == "Churn" {
                *name = target.to_string();
            }
        }
        schema
    }

    /// Add or replace a column
    pub fn with_column(mut self, name: impl Into<String>, ty: SemanticType) -> Self {
        let name = name.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = ty,
            None => self.columns.push((name, ty)),
        }
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, SemanticType)> {
        self.columns.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn get(&self, name: &str) -> Option<SemanticType> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Findings of one validation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// False as soon as any warning or error is recorded
    pub passed: bool,
    pub warnings: Vec<String>,
    /// Error-class findings. The only ones (empty table, missing schema
    /// columns) abort validation, so a returned report always has none.
    pub errors: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            passed: true,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Record a non-fatal finding
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
        self.passed = false;
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One-line summary suitable for logs
    pub fn summary(&self) -> String {
        if self.passed {
            "Data validation passed with no critical issues".to_string()
        } else {
            format!(
                "Validation completed with {} warning(s) and {} error(s)",
                self.warnings.len(),
                self.errors.len()
            )
        }
    }
}

/// Validation result: the report plus the schema-coerced table
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    pub data: DataFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_order() {
        let schema = ExpectedSchema::default();
        let names: Vec<&str> = schema.columns().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["tenure", "MonthlyCharges", "TotalCharges", "SeniorCitizen", "Churn"]
        );
        assert_eq!(schema.get("SeniorCitizen"), Some(SemanticType::Int));
    }

    #[test]
    fn test_schema_with_renamed_target() {
        let schema = ExpectedSchema::churn_with_target("Exited");
        assert_eq!(schema.get("Exited"), Some(SemanticType::Text));
        assert_eq!(schema.get("Churn"), None);
        assert_eq!(schema.len(), 5);
    }

    #[test]
    fn test_report_warning_clears_passed() {
        let mut report = ValidationReport::new();
        assert!(report.passed);
        report.warn("2 duplicate rows found");
        assert!(!report.passed);
        assert!(report.has_warnings());
        assert!(!report.has_errors());
        assert!(report.summary().contains("1 warning(s)"));
    }
}
