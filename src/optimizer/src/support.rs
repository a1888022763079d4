//! Stateless helpers shared by the optimizer passes.
use common::query_tree::{Operand, Predicate};
use common::table::Table;
use common::DbError;
use std::sync::Arc;

/// Table part of a qualified column name. Unqualified names are returned whole.
pub fn table_of(column: &str) -> &str {
    match column.find('.') {
        Some(i) => &column[..i],
        None => column,
    }
}

/// Column part of a qualified column name.
pub fn unqualified(column: &str) -> &str {
    match column.find('.') {
        Some(i) => &column[i + 1..],
        None => column,
    }
}

/// Qualifies a column name as `Table.Column` using the declared spelling of both parts.
///
/// Unqualified names go to the first table in `scope` that has the column.
///
/// # Arguments
///
/// * `column` - Column name, qualified or not.
/// * `scope` - Tables of the statement, in the order they are scanned.
pub fn qualify(column: &str, scope: &[Arc<Table>]) -> Result<String, DbError> {
    let name = unqualified(column);
    let owner = if column.contains('.') {
        let table = table_of(column);
        scope.iter().find(|t| t.is_named(table))
    } else {
        scope.iter().find(|t| t.schema.contains(name))
    };
    owner
        .and_then(|t| {
            t.schema
                .get_attribute_by_name(name)
                .map(|a| format!("{}.{}", t.name, a.name()))
        })
        .ok_or_else(|| DbError::ColumnNotFound(column.to_string()))
}

/// Qualifies both sides of a predicate. Literals are left alone.
pub fn qualify_predicate(pred: &Predicate, scope: &[Arc<Table>]) -> Result<Predicate, DbError> {
    let operand = match &pred.operand {
        Operand::Column(c) => Operand::Column(qualify(c, scope)?),
        literal => literal.clone(),
    };
    Ok(Predicate::new(
        &qualify(&pred.column, scope)?,
        pred.comparator,
        operand,
    ))
}

/// A predicate joins two tables when its operand is a column of another table.
pub fn is_join_predicate(pred: &Predicate) -> bool {
    match &pred.operand {
        Operand::Column(other) => !table_of(&pred.column).eq_ignore_ascii_case(table_of(other)),
        Operand::Literal(_) => false,
    }
}

/// The two tables a join predicate connects.
pub fn join_tables(pred: &Predicate) -> Option<(&str, &str)> {
    match &pred.operand {
        Operand::Column(other) if is_join_predicate(pred) => {
            Some((table_of(&pred.column), table_of(other)))
        }
        _ => None,
    }
}

/// Appends the columns not already in `into`, ignoring case.
pub fn merge_columns<'a, I>(into: &mut Vec<String>, columns: I)
where
    I: IntoIterator<Item = &'a str>,
{
    for column in columns {
        if !into.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            into.push(column.to_string());
        }
    }
}

/// Every unordered pair of distinct tables, in scope order.
pub fn relation_pairs(scope: &[Arc<Table>]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, left) in scope.iter().enumerate() {
        for right in &scope[i + 1..] {
            pairs.push((left.name.clone(), right.name.clone()));
        }
    }
    pairs
}

/// Whether `a` and `b` form one of `pairs`, in either order.
pub fn contains_pair(pairs: &[(String, String)], a: &str, b: &str) -> bool {
    pairs.iter().any(|(l, r)| {
        (l.eq_ignore_ascii_case(a) && r.eq_ignore_ascii_case(b))
            || (l.eq_ignore_ascii_case(b) && r.eq_ignore_ascii_case(a))
    })
}

/// Columns of `table` among `columns`, in the table's schema order.
pub fn columns_of_table<'a, I>(table: &Table, columns: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut positions: Vec<(usize, String)> = Vec::new();
    for column in columns {
        if !table.is_named(table_of(column)) {
            continue;
        }
        if let Some(i) = table.schema.get_field_index(unqualified(column)) {
            if !positions.iter().any(|(p, _)| p == i) {
                positions.push((*i, column.to_string()));
            }
        }
    }
    positions.sort_by_key(|(i, _)| *i);
    positions.into_iter().map(|(_, c)| c).collect()
}

/// All columns of all tables in `scope`, qualified, for `SELECT *`.
pub fn expand_wildcard(scope: &[Arc<Table>]) -> Vec<String> {
    scope
        .iter()
        .flat_map(|t| {
            t.schema
                .attributes()
                .map(move |a| format!("{}.{}", t.name, a.name()))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use common::catalog::Catalog;
    use common::query_tree::Comparator;
    use common::testutil::*;

    fn scope(names: &[&str]) -> Vec<Arc<Table>> {
        let db = sample_database();
        names.iter().map(|n| db.get_table(n).unwrap()).collect()
    }

    #[test]
    fn test_qualify() {
        init();
        let tables = scope(&["Orders", "Customers"]);
        assert_eq!("Orders.CustomerID", qualify("customerid", &tables).unwrap());
        assert_eq!("Customers.FirstName", qualify("FirstName", &tables).unwrap());
        assert_eq!(
            "Customers.CustomerID",
            qualify("customers.CUSTOMERID", &tables).unwrap()
        );
        assert_eq!(
            Err(DbError::ColumnNotFound(String::from("Price"))),
            qualify("Price", &tables)
        );
        assert!(qualify("Products.Price", &tables).is_err());
    }

    #[test]
    fn test_join_predicate_detection() {
        let join = Predicate::column_eq("Customers.CustomerID", "Orders.CustomerID");
        assert!(is_join_predicate(&join));
        assert_eq!(Some(("Customers", "Orders")), join_tables(&join));

        let same_table = Predicate::column_eq("Orders.OrderID", "orders.CustomerID");
        assert!(!is_join_predicate(&same_table));
        let literal = Predicate::literal("Orders.Amount", Comparator::GreaterThan, "10");
        assert!(!is_join_predicate(&literal));
        assert_eq!(None, join_tables(&literal));
    }

    #[test]
    fn test_merge_and_order() {
        let mut cols = vec![String::from("Orders.Amount")];
        merge_columns(&mut cols, vec!["orders.amount", "Orders.OrderID"]);
        assert_eq!(vec!["Orders.Amount", "Orders.OrderID"], cols);

        let orders = &scope(&["Orders"])[0];
        assert_eq!(
            vec!["Orders.OrderID", "Orders.Amount"],
            columns_of_table(orders, vec!["Orders.Amount", "Customers.FirstName", "Orders.OrderID", "Orders.Amount"])
        );
    }

    #[test]
    fn test_pairs_and_wildcard() {
        let tables = scope(&["Customers", "Orders", "Products"]);
        let pairs = relation_pairs(&tables);
        assert_eq!(3, pairs.len());
        assert!(contains_pair(&pairs, "products", "Customers"));
        assert!(!contains_pair(&pairs, "Products", "Suppliers"));

        let all = expand_wildcard(&tables[..2]);
        assert_eq!(7, all.len());
        assert_eq!("Customers.CustomerID", all[0]);
        assert_eq!("Orders.Amount", all[6]);
    }
}
