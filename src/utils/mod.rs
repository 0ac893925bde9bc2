//! Utility functions and types

pub mod data_loader;
pub mod frame;

pub use data_loader::{DataLoader, DataSaver, FileInfo};
pub use frame::{
    column_names, distinct_non_null, drop_duplicate_rows, duplicate_count, is_numeric, is_text, median,
    sorted_categories,
};
