use crate::TableSchema;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Table implementation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Table id.
    pub id: u64,
    /// Table schema.
    pub schema: TableSchema,
    /// Columns of the primary key.
    pub primary_key: Vec<String>,
    /// Foreign keys, keyed by the referenced table. The value is the local column.
    pub foreign_keys: HashMap<String, String>,
}

impl Table {
    /// Creates a new table with the given name and schema and no key constraints.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table.
    /// * `schema` - Schema of the table.
    pub fn new(name: String, schema: TableSchema) -> Self {
        let table_id = Table::get_table_id(&name);

        Table {
            name,
            id: table_id,
            schema,
            primary_key: Vec::new(),
            foreign_keys: HashMap::new(),
        }
    }

    /// Sets the primary key columns.
    pub fn with_primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    /// Adds a foreign key from `column` to `referenced_table`.
    pub fn with_foreign_key(mut self, referenced_table: &str, column: &str) -> Self {
        self.foreign_keys
            .insert(referenced_table.to_string(), column.to_string());
        self
    }

    /// Creates table id of the table by hashing the lower-cased table name.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of table to get the id for.
    pub fn get_table_id(name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.to_lowercase().hash(&mut hasher);
        hasher.finish()
    }

    /// Checks if the table name matches, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Returns true if `column` is part of the primary key.
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::DataType;

    #[test]
    fn test_table_id_ignores_case() {
        assert_eq!(Table::get_table_id("Orders"), Table::get_table_id("ORDERS"));
        assert_ne!(Table::get_table_id("Orders"), Table::get_table_id("Customers"));
    }

    #[test]
    fn test_keys() {
        let schema = TableSchema::from_vecs(
            vec!["OrderID", "CustomerID"],
            vec![DataType::Number, DataType::Number],
        );
        let table = Table::new(String::from("Orders"), schema)
            .with_primary_key(vec![String::from("OrderID")])
            .with_foreign_key("Customers", "CustomerID");
        assert!(table.is_primary_key("orderid"));
        assert!(!table.is_primary_key("CustomerID"));
        assert_eq!(
            Some(&String::from("CustomerID")),
            table.foreign_keys.get("Customers")
        );
        assert!(table.is_named("orders"));
    }
}
