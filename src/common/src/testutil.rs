use crate::database::Database;
use crate::table::Table;
use crate::{DataType, TableSchema};

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Schema of the `Customers` fixture table.
pub fn customers_schema() -> TableSchema {
    TableSchema::from_vecs(
        vec!["CustomerID", "FirstName", "LastName"],
        vec![DataType::Number, DataType::Char, DataType::Char],
    )
}

/// Creates a table with the given column names and dtypes.
///
/// # Arguments
///
/// * `name` - Table name.
/// * `columns` - Column names paired with their dtypes.
pub fn table_with(name: &str, columns: Vec<(&str, DataType)>) -> Table {
    let (names, dtypes): (Vec<&str>, Vec<DataType>) = columns.into_iter().unzip();
    Table::new(name.to_string(), TableSchema::from_vecs(names, dtypes))
}

/// Four-table sales catalog used across the test suites.
///
/// Declaration order is Customers, Orders, Products, Suppliers. `CustomerID` and
/// `SupplierID` each appear in two tables.
pub fn sample_database() -> Database {
    let db = Database::new(String::from("sales"));
    let customers = Table::new(String::from("Customers"), customers_schema())
        .with_primary_key(vec![String::from("CustomerID")]);
    let orders = table_with(
        "Orders",
        vec![
            ("OrderID", DataType::Number),
            ("CustomerID", DataType::Number),
            ("OrderDate", DataType::Date),
            ("Amount", DataType::Number),
        ],
    )
    .with_primary_key(vec![String::from("OrderID")])
    .with_foreign_key("Customers", "CustomerID");
    let products = table_with(
        "Products",
        vec![
            ("ProductID", DataType::Number),
            ("ProductName", DataType::Char),
            ("SupplierID", DataType::Number),
            ("Price", DataType::Number),
        ],
    )
    .with_primary_key(vec![String::from("ProductID")])
    .with_foreign_key("Suppliers", "SupplierID");
    let suppliers = table_with(
        "Suppliers",
        vec![
            ("SupplierID", DataType::Number),
            ("SupplierName", DataType::Char),
            ("Country", DataType::Char),
        ],
    )
    .with_primary_key(vec![String::from("SupplierID")]);

    for table in vec![customers, orders, products, suppliers] {
        // Fixture names are distinct.
        let _ = db.add_table(table);
    }
    db
}

/// Catalog of `n` tables `T0..Tn`, each with a shared `id` column and its own `v{i}` column.
pub fn chain_database(n: usize) -> Database {
    let db = Database::new(format!("chain{}", n));
    for i in 0..n {
        let value = format!("v{}", i);
        let table = table_with(
            &format!("T{}", i),
            vec![("id", DataType::Number), (value.as_str(), DataType::Number)],
        );
        let _ = db.add_table(table);
    }
    db
}
