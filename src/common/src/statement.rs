//! Validated SELECT statement, one field per grammar position.
//!
//! The compiler fills a [`QueryStatement`] after checking tables and columns against the
//! catalog; the optimizer only reads it.
use crate::query_tree::{AggregateColumn, AggregatePredicate, Predicate};

/// Item of the SELECT list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`, expanded to every column of every referenced table.
    Wildcard,
    Column(String),
    Aggregate(AggregateColumn),
}

/// How a JOIN clause relates its table to the ones before it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Vec<Predicate>),
    /// Columns present in both sides, compared for equality.
    Using(Vec<String>),
    Cross,
}

/// `[INNER|CROSS] JOIN table ...`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub constraint: JoinConstraint,
}

impl JoinClause {
    pub fn new(table: &str, constraint: JoinConstraint) -> Self {
        Self {
            table: table.to_string(),
            constraint,
        }
    }
}

/// A SELECT statement broken into its clauses.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct QueryStatement {
    pub select: Vec<SelectItem>,
    pub from: Vec<String>,
    pub joins: Vec<JoinClause>,
    /// ANDed WHERE predicates.
    pub selection: Vec<Predicate>,
    pub group_by: Vec<String>,
    /// ANDed HAVING predicates.
    pub having: Vec<AggregatePredicate>,
}

impl QueryStatement {
    /// Creates a statement with only SELECT and FROM clauses.
    ///
    /// # Arguments
    ///
    /// * `select` - SELECT list.
    /// * `from` - Comma separated FROM tables, in order.
    pub fn new(select: Vec<SelectItem>, from: Vec<&str>) -> Self {
        Self {
            select,
            from: from.into_iter().map(String::from).collect(),
            ..Default::default()
        }
    }

    pub fn with_join(mut self, table: &str, constraint: JoinConstraint) -> Self {
        self.joins.push(JoinClause::new(table, constraint));
        self
    }

    pub fn with_where(mut self, predicate: Predicate) -> Self {
        self.selection.push(predicate);
        self
    }

    pub fn with_group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    pub fn with_having(mut self, predicate: AggregatePredicate) -> Self {
        self.having.push(predicate);
        self
    }

    pub fn select_items(&self) -> &[SelectItem] {
        &self.select
    }

    pub fn from_tables(&self) -> &[String] {
        &self.from
    }

    pub fn join_clauses(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn where_predicates(&self) -> &[Predicate] {
        &self.selection
    }

    pub fn group_by_columns(&self) -> &[String] {
        &self.group_by
    }

    pub fn having_predicates(&self) -> &[AggregatePredicate] {
        &self.having
    }

    /// FROM tables followed by JOIN tables, in the order they are written.
    pub fn referenced_tables(&self) -> Vec<&str> {
        self.from
            .iter()
            .map(|t| t.as_str())
            .chain(self.joins.iter().map(|j| j.table.as_str()))
            .collect()
    }

    /// True when the statement computes aggregates or groups rows.
    pub fn has_aggregate(&self) -> bool {
        self.select
            .iter()
            .any(|item| matches!(item, SelectItem::Aggregate(_)))
            || !self.group_by.is_empty()
            || !self.having.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query_tree::{AggOp, Comparator};

    #[test]
    fn test_referenced_tables_keeps_order() {
        let stmt = QueryStatement::new(vec![SelectItem::Wildcard], vec!["Orders", "Customers"])
            .with_join("Products", JoinConstraint::Cross)
            .with_join(
                "Suppliers",
                JoinConstraint::Using(vec![String::from("SupplierID")]),
            );
        assert_eq!(
            vec!["Orders", "Customers", "Products", "Suppliers"],
            stmt.referenced_tables()
        );
        assert_eq!(2, stmt.join_clauses().len());
    }

    #[test]
    fn test_has_aggregate() {
        let plain = QueryStatement::new(
            vec![SelectItem::Column(String::from("Customers.FirstName"))],
            vec!["Customers"],
        );
        assert!(!plain.has_aggregate());

        let counted = QueryStatement::new(
            vec![SelectItem::Aggregate(AggregateColumn::new(AggOp::Count, "*"))],
            vec!["Customers"],
        );
        assert!(counted.has_aggregate());

        let grouped = plain.clone().with_group_by("Customers.FirstName");
        assert!(grouped.has_aggregate());

        let having = plain.with_having(AggregatePredicate::new(
            AggOp::Count,
            "Customers.CustomerID",
            Comparator::GreaterThan,
            "1",
        ));
        assert!(having.has_aggregate());
    }
}
