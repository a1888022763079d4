use crate::ddl;
use crate::query::TranslateAndValidate;
use common::catalog::Catalog;
use common::database::Database;
use common::query_tree::QueryTree;
use common::DbError;
use optimizer::{Optimizer, OptimizerConfig};
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Result of running one SQL statement.
#[derive(Debug)]
pub enum Outcome {
    /// Name of the table added to the catalog.
    TableCreated(String),
    /// The optimizer snapshots of a query, initial tree first.
    Plan(Vec<QueryTree>),
}

/// Runs SQL text against a catalog: DDL extends it, queries are optimized.
pub struct Compiler {
    pub database: Database,
    pub config: OptimizerConfig,
}

impl Compiler {
    pub fn new(database: Database, config: OptimizerConfig) -> Self {
        Compiler { database, config }
    }

    pub fn set_join_optimization(&mut self, enabled: bool) {
        self.config.join_optimization = enabled;
    }

    /// Parses and runs every statement of `sql`, stopping at the first error.
    ///
    /// # Arguments
    ///
    /// * `sql` - One or more `;` separated statements.
    pub fn run_sql(&self, sql: &str) -> Result<Vec<Outcome>, DbError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql)?;
        if statements.is_empty() {
            return Err(DbError::ParseError(String::from("Empty SQL command")));
        }
        let mut outcomes = Vec::with_capacity(statements.len());
        for stmt in &statements {
            outcomes.push(self.run_statement(stmt)?);
        }
        Ok(outcomes)
    }

    /// Runs one parsed statement.
    ///
    /// Only `CREATE TABLE` and `SELECT` queries are supported.
    ///
    /// # Arguments
    ///
    /// * `stmt` - Statement to run.
    pub fn run_statement(&self, stmt: &Statement) -> Result<Outcome, DbError> {
        match stmt {
            Statement::CreateTable { name, .. } => {
                info!("Processing CREATE table: {}", name);
                self.create_table(stmt)
            }
            Statement::Query(qbox) => {
                info!("Processing SQL Query");
                self.run_query(qbox)
            }
            _ => Err(DbError::ValidationError(format!(
                "Not supported: {}",
                stmt
            ))),
        }
    }

    fn create_table(&self, stmt: &Statement) -> Result<Outcome, DbError> {
        let table = ddl::table_from_create(stmt)?;
        for referenced in table.foreign_keys.keys() {
            if !table.is_named(referenced) && !self.database.is_valid_table(referenced) {
                return Err(DbError::ValidationError(format!(
                    "Foreign key of {} references unknown table {}",
                    table.name, referenced
                )));
            }
        }
        let name = table.name.clone();
        self.database.add_table(table)?;
        Ok(Outcome::TableCreated(name))
    }

    /// Validates a query and returns every optimizer snapshot.
    ///
    /// # Arguments
    ///
    /// * `query` - Query to run.
    fn run_query(&self, query: &sqlparser::ast::Query) -> Result<Outcome, DbError> {
        debug!("Obtaining statement from query's AST");
        let statement = TranslateAndValidate::from_sql(query, &self.database)?;
        let mut optimizer = Optimizer::new(&self.database, statement)?.with_config(self.config);
        let snapshots = optimizer.optimize()?.to_vec();
        Ok(Outcome::Plan(snapshots))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::query_tree::OperatorKind;
    use common::testutil::*;
    use optimizer::STAGE_NAMES;

    fn plan(outcome: Outcome) -> Vec<QueryTree> {
        match outcome {
            Outcome::Plan(trees) => trees,
            other => panic!("expected a plan, got {:?}", other),
        }
    }

    #[test]
    fn test_create_then_query() {
        init();
        let compiler = Compiler::new(Database::new(String::from("shop")), OptimizerConfig::default());
        let outcomes = compiler
            .run_sql(
                "CREATE TABLE Customers (CustomerID INT PRIMARY KEY, FirstName VARCHAR(20)); \
                 CREATE TABLE Orders (OrderID INT, CustomerID INT REFERENCES Customers(CustomerID)); \
                 SELECT FirstName FROM Customers JOIN Orders ON Customers.CustomerID = Orders.CustomerID",
            )
            .unwrap();
        assert_eq!(3, outcomes.len());
        let mut outcomes = outcomes.into_iter();
        match outcomes.next() {
            Some(Outcome::TableCreated(name)) => assert_eq!("Customers", name),
            other => panic!("unexpected {:?}", other),
        }
        let trees = plan(outcomes.nth(1).unwrap());
        assert_eq!(STAGE_NAMES.len(), trees.len());
        let last = trees.last().unwrap();
        assert_eq!(1, last.get_type_occurrence(OperatorKind::InnerJoin));
        assert_eq!(0, last.get_type_occurrence(OperatorKind::CartesianProduct));
    }

    #[test]
    fn test_join_optimization_toggle() {
        init();
        let mut compiler = Compiler::new(sample_database(), OptimizerConfig::default());
        compiler.set_join_optimization(false);
        let trees = plan(
            compiler
                .run_statement(
                    &Parser::parse_sql(
                        &GenericDialect {},
                        "SELECT OrderID FROM Orders, Customers WHERE Orders.CustomerID = Customers.CustomerID",
                    )
                    .unwrap()[0],
                )
                .unwrap(),
        );
        let last = trees.last().unwrap();
        assert_eq!(0, last.get_type_occurrence(OperatorKind::InnerJoin));
        assert_eq!(1, last.get_type_occurrence(OperatorKind::CartesianProduct));
    }

    #[test]
    fn test_errors() {
        init();
        let compiler = Compiler::new(sample_database(), OptimizerConfig::default());
        assert!(matches!(
            compiler.run_sql("SELEC * FROM Customers"),
            Err(DbError::ParseError(_))
        ));
        assert!(matches!(
            compiler.run_sql("SELECT * FROM Invoices"),
            Err(DbError::ValidationError(_))
        ));
        assert!(matches!(
            compiler.run_sql("DROP TABLE Customers"),
            Err(DbError::ValidationError(_))
        ));
        assert!(matches!(
            compiler.run_sql("CREATE TABLE Customers (a INT)"),
            Err(DbError::ValidationError(_))
        ));
        assert!(matches!(
            compiler.run_sql("CREATE TABLE Lines (a INT REFERENCES Invoices(id))"),
            Err(DbError::ValidationError(_))
        ));
        assert!(matches!(compiler.run_sql(""), Err(_)));
    }
}
