//! Exact-name lookups over a fetched schema.
//!
//! Matching is case-sensitive with no normalization: `Customers` and
//! `customers` are different tables.

use crate::model::{Field, Table};

pub fn find_table_by_name<'a>(tables: &'a [Table], name: &str) -> Option<&'a Table> {
    tables.iter().find(|t| t.name == name)
}

/// Returns `None` straight away when `table` is absent.
pub fn find_field_by_name<'a>(table: Option<&'a Table>, name: &str) -> Option<&'a Field> {
    table?.fields.iter().find(|f| f.name == name)
}

pub(crate) fn table_index(tables: &[Table], name: &str) -> Option<usize> {
    tables.iter().position(|t| t.name == name)
}
