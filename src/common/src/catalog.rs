use crate::table::*;
use crate::{DbError, TableSchema};
use std::sync::{Arc, RwLock};

/// Ordered list of tables, shared between the catalog owner and its readers.
pub type TableList = Arc<RwLock<Vec<Arc<Table>>>>;

/// Functions needed to implement a catalog. It keeps track of all available tables in the database and their associated schemas.
///
/// Tables are kept in declaration order; lookups that could match more than one table resolve to the first one.
pub trait Catalog {
    /// Get tables from catalog.
    fn get_tables(&self) -> TableList;

    /// Takes a consistent copy of the table list, e.g. for the duration of one optimizer run.
    fn snapshot(&self) -> Result<Vec<Arc<Table>>, DbError> {
        let tables = self.get_tables();
        let tables_ref = tables
            .read()
            .map_err(|_| DbError::DbError(String::from("Catalog lock poisoned")))?;
        Ok(tables_ref.clone())
    }

    /// Get the table with the given name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the table, matched case-insensitively.
    fn get_table(&self, name: &str) -> Result<Arc<Table>, DbError> {
        self.snapshot()?
            .into_iter()
            .find(|t| t.is_named(name))
            .ok_or_else(|| DbError::RelationNotFound(name.to_string()))
    }

    /// Checks if the table name is valid in the catalog.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to check if it is valid.
    fn is_valid_table(&self, name: &str) -> bool {
        self.get_table(name).is_ok()
    }

    /// Checks if the column is valid for the given table.
    ///
    /// # Arguments
    ///
    /// * `table` - Name of table to look for the column name in.
    /// * `col_name` - Name of column to look for in the table.
    fn is_valid_column(&self, table: &str, col_name: &str) -> bool {
        match self.get_table(table) {
            Ok(t) => t.schema.contains(col_name),
            _ => false,
        }
    }

    /// Checks if the column of the given table is a NUMBER column.
    ///
    /// # Arguments
    ///
    /// * `table` - Name of table that holds the column.
    /// * `col_name` - Name of column.
    fn is_numeric_column(&self, table: &str, col_name: &str) -> Result<bool, DbError> {
        let table_ref = self.get_table(table)?;
        table_ref
            .schema
            .get_attribute_by_name(col_name)
            .map(|a| a.is_numeric())
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", table, col_name)))
    }

    /// Finds the first table, in declaration order, that has a column with the given name.
    ///
    /// # Arguments
    ///
    /// * `col_name` - Unqualified column name.
    fn owner_of_column(&self, col_name: &str) -> Result<Arc<Table>, DbError> {
        self.snapshot()?
            .into_iter()
            .find(|t| t.schema.contains(col_name))
            .ok_or_else(|| DbError::ColumnNotFound(col_name.to_string()))
    }

    /// Gets the table schema from the catalog.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to get the schema for.
    fn get_table_schema(&self, name: &str) -> Result<TableSchema, DbError> {
        Ok(self.get_table(name)?.schema.clone())
    }

    /// Names of all tables, in declaration order.
    fn get_table_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.snapshot()?.iter().map(|t| t.name.clone()).collect())
    }
}
