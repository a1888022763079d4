use crate::catalog::{Catalog, TableList};
use crate::table::*;
use crate::DbError;
use std::sync::{Arc, RwLock};

/// The actual database.
#[derive(Clone, Serialize, Deserialize)]
pub struct Database {
    /// Name of the database.
    pub name: String,
    /// Tables in declaration order. The lock allows DDL while readers take snapshots.
    #[serde(skip)]
    pub tables: TableList,
}

impl Database {
    /// Initialize a new database with a given name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name for the new database.
    pub fn new(name: String) -> Self {
        Database {
            name,
            tables: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Appends a table to the catalog.
    ///
    /// # Arguments
    ///
    /// * `table` - Table to add. Its name must not be taken yet.
    pub fn add_table(&self, table: Table) -> Result<(), DbError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DbError::DbError(String::from("Catalog lock poisoned")))?;
        if tables.iter().any(|t| t.is_named(&table.name)) {
            return Err(DbError::ValidationError(format!(
                "Table {} already exists",
                table.name
            )));
        }
        tables.push(Arc::new(table));
        Ok(())
    }
}

impl Catalog for Database {
    /// Gets the tables from the catalog of the database.
    fn get_tables(&self) -> TableList {
        self.tables.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_add_table_rejects_duplicates() {
        let db = sample_database();
        let count = db.get_table_names().unwrap().len();
        let dup = Table::new(String::from("CUSTOMERS"), customers_schema());
        assert!(db.add_table(dup).is_err());
        assert_eq!(count, db.get_table_names().unwrap().len());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let db = sample_database();
        let snapshot = db.snapshot().unwrap();
        let extra = Table::new(String::from("Invoices"), customers_schema());
        db.add_table(extra).unwrap();
        assert_eq!(snapshot.len() + 1, db.snapshot().unwrap().len());
    }
}
