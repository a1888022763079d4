use common::catalog::Catalog;
use common::query_tree::{AggregateColumn, AggregatePredicate, Operand, Predicate};
use common::statement::{JoinClause, JoinConstraint, QueryStatement, SelectItem};
use common::{get_name, AggOp, Comparator, DataType, DbError};
use sqlparser::ast::{
    self, BinaryOperator, Expr, Function, FunctionArg, FunctionArgExpr, JoinOperator, SetExpr,
    TableFactor, UnaryOperator, Value,
};

/// A column resolved against the tables of the query.
#[derive(Debug, Clone)]
struct ResolvedColumn {
    /// `Table.Column`, using the declared names.
    name: String,
    dtype: DataType,
}

/// One side of a comparison.
enum PredExpr {
    Column(ResolvedColumn),
    /// Literal as written, string literals keep their quotes.
    Literal(String),
}

/// Translates input to a QueryStatement.
/// Validates the columns and tables referenced using the catalog.
/// Shares lifetime 'a with catalog
pub struct TranslateAndValidate<'a, T: Catalog> {
    /// Statement filled in so far.
    statement: QueryStatement,
    /// Catalog to validate the translations.
    catalog: &'a T,
    /// List of tables encountered. Used for field validation.
    tables: Vec<String>,
}

impl<'a, T: 'a + Catalog> TranslateAndValidate<'a, T> {
    /// Creates a new TranslateAndValidate object.
    fn new(catalog: &'a T) -> Self {
        Self {
            statement: QueryStatement::default(),
            catalog,
            tables: Vec::new(),
        }
    }

    /// Given a column name, try to figure out what table it belongs to by looking through all of the tables.
    ///
    /// # Arguments
    ///
    /// * `identifiers` - a list of elements in a multi-part identifier e.g. table.column would be vec!["table", "column"]
    fn disambiguate_name(&self, identifiers: Vec<&str>) -> Result<ResolvedColumn, DbError> {
        let orig = identifiers.join(".");
        if identifiers.len() > 2 {
            return Err(DbError::ValidationError(format!(
                "No . table names supported in field {}",
                orig
            )));
        }
        if identifiers.len() == 2 {
            if let Some(table) = self.listed_table(identifiers[0]) {
                if let Some(column) = self.lookup_column(table, identifiers[1])? {
                    return Ok(column);
                }
            }
            return Err(DbError::ValidationError(format!(
                "The field {} is not present in tables listed in the query",
                orig
            )));
        }

        let mut field = None;
        for table in &self.tables {
            if let Some(column) = self.lookup_column(table, &orig)? {
                if field.is_some() {
                    return Err(DbError::ValidationError(format!(
                        "The field {} could refer to more than one table listed in the query",
                        orig
                    )));
                }
                field = Some(column);
            }
        }

        field.ok_or_else(|| {
            DbError::ValidationError(format!(
                "The field {} is not present in tables listed in the query",
                orig
            ))
        })
    }

    /// Returns the declared name of a table listed in the query, matched case-insensitively.
    fn listed_table(&self, name: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.eq_ignore_ascii_case(name))
            .map(|t| t.as_str())
    }

    fn lookup_column(&self, table: &str, column: &str) -> Result<Option<ResolvedColumn>, DbError> {
        let schema = self.catalog.get_table_schema(table)?;
        Ok(schema
            .get_attribute_by_name(column)
            .map(|attr| ResolvedColumn {
                name: format!("{}.{}", table, attr.name()),
                dtype: *attr.dtype(),
            }))
    }

    /// Translates a sqlparser::ast::Query to a QueryStatement.
    ///
    /// Validates the columns and tables referenced using the catalog.
    /// All table names referenced in from and join clauses are added to self.tables.
    ///
    /// # Arguments
    ///
    /// * `sql` - AST to translate.
    /// * `catalog` - Catalog for validation.
    pub fn from_sql(sql: &ast::Query, catalog: &T) -> Result<QueryStatement, DbError> {
        let mut translator = TranslateAndValidate::new(catalog);
        translator.process_query(sql)?;
        Ok(translator.statement)
    }

    /// Helper function to process sqlparser::ast::Query
    ///
    /// # Arguments
    ///
    /// * `query` - AST to process.
    fn process_query(&mut self, query: &ast::Query) -> Result<(), DbError> {
        if query.with.is_some() {
            return Err(DbError::ValidationError(String::from(
                "WITH clauses not supported",
            )));
        }
        if !query.order_by.is_empty()
            || query.limit.is_some()
            || query.offset.is_some()
            || query.fetch.is_some()
        {
            return Err(DbError::ValidationError(String::from(
                "ORDER BY, LIMIT and OFFSET not supported",
            )));
        }
        match &*query.body {
            SetExpr::Select(b) => self.process_select(b),
            SetExpr::Query(_) => Err(DbError::ValidationError(String::from(
                "Subqueries not supported",
            ))),
            SetExpr::SetOperation { .. } => Err(DbError::ValidationError(String::from(
                "Set operations not supported",
            ))),
            _ => Err(DbError::ValidationError(String::from(
                "Only SELECT queries are supported",
            ))),
        }
    }

    /// Helper function to process sqlparser::ast::Select
    ///
    /// # Arguments
    ///
    /// * `select` - AST of a select query to process.
    fn process_select(&mut self, select: &ast::Select) -> Result<(), DbError> {
        if select.distinct.is_some() {
            return Err(DbError::ValidationError(String::from(
                "Distinct not supported",
            )));
        }
        if select.top.is_some() || select.into.is_some() || select.qualify.is_some() {
            return Err(DbError::ValidationError(String::from(
                "Unsupported SELECT clause",
            )));
        }

        // From, comma separated tables first, then the joins of each
        for sel in &select.from {
            let table = self.process_table_factor(&sel.relation)?;
            self.statement.from.push(table);
        }
        for sel in &select.from {
            for join in &sel.joins {
                let clause = self.process_join(join)?;
                self.statement.joins.push(clause);
            }
        }
        if self.tables.is_empty() {
            return Err(DbError::ValidationError(String::from(
                "A FROM clause is required",
            )));
        }

        // Where
        if let Some(expr) = &select.selection {
            self.statement.selection = self.process_conjunction(expr)?;
        }

        // Select
        for item in &select.projection {
            let item = match item {
                ast::SelectItem::Wildcard(_) => {
                    if select.projection.len() > 1 {
                        return Err(DbError::ValidationError(String::from(
                            "Cannot select wildcard and exp in same select",
                        )));
                    }
                    SelectItem::Wildcard
                }
                ast::SelectItem::UnnamedExpr(expr) => self.expr_to_select_item(expr)?,
                // Aliases only rename output columns, which the plan does not carry.
                ast::SelectItem::ExprWithAlias { expr, .. } => self.expr_to_select_item(expr)?,
                ast::SelectItem::QualifiedWildcard(..) => {
                    return Err(DbError::ValidationError(String::from(
                        "Select unsupported expression",
                    )));
                }
            };
            self.statement.select.push(item);
        }

        // Group by
        for expr in &select.group_by {
            let column = match expr {
                Expr::Identifier(_) | Expr::CompoundIdentifier(_) => self.expr_to_column(expr)?,
                _ => {
                    return Err(DbError::ValidationError(String::from(
                        "Group by unsupported expression",
                    )));
                }
            };
            if !self
                .statement
                .group_by
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&column.name))
            {
                self.statement.group_by.push(column.name);
            }
        }

        // Having
        if let Some(expr) = &select.having {
            self.statement.having = self.process_having(expr)?;
        }

        self.validate_grouping()
    }

    /// Checks that only aggregates and group by fields are projected out.
    fn validate_grouping(&self) -> Result<(), DbError> {
        if !self.statement.has_aggregate() {
            return Ok(());
        }
        for item in &self.statement.select {
            match item {
                SelectItem::Wildcard => {
                    return Err(DbError::ValidationError(String::from(
                        "Cannot select wildcard in an aggregate query",
                    )));
                }
                SelectItem::Column(c) => {
                    if !self
                        .statement
                        .group_by
                        .iter()
                        .any(|g| g.eq_ignore_ascii_case(c))
                    {
                        return Err(DbError::ValidationError(format!(
                            "The expression '{}' must be part of an aggregate function or group by",
                            c
                        )));
                    }
                }
                SelectItem::Aggregate(_) => {}
            }
        }
        Ok(())
    }

    /// Validates the table, adds it to self.tables and returns its declared name.
    ///
    /// # Arguments
    ///
    /// * `tf` - Table to process.
    fn process_table_factor(&mut self, tf: &TableFactor) -> Result<String, DbError> {
        match tf {
            TableFactor::Table {
                name, alias, args, ..
            } => {
                if alias.is_some() || args.is_some() {
                    return Err(DbError::ValidationError(String::from(
                        "Table aliases and table functions not supported",
                    )));
                }
                let name = get_name(name)?;
                let table = self.catalog.get_table(&name).map_err(|_| {
                    DbError::ValidationError(format!("Invalid table name {}", name))
                })?;
                if self.listed_table(&table.name).is_some() {
                    return Err(DbError::ValidationError(format!(
                        "Table {} is listed more than once",
                        table.name
                    )));
                }
                self.tables.push(table.name.clone());
                Ok(table.name.clone())
            }
            _ => Err(DbError::ValidationError(String::from(
                "Nested joins and derived tables not supported",
            ))),
        }
    }

    /// Parses sqlparser::ast::Join into a JoinClause.
    ///
    /// The joined table is listed before the constraint is read, so ON predicates may use its columns.
    ///
    /// # Arguments
    ///
    /// * `join` - The join node to parse.
    fn process_join(&mut self, join: &ast::Join) -> Result<JoinClause, DbError> {
        let earlier = self.tables.clone();
        let table = self.process_table_factor(&join.relation)?;
        let constraint = match &join.join_operator {
            JoinOperator::Inner(ast::JoinConstraint::On(expr)) => {
                JoinConstraint::On(self.process_conjunction(expr)?)
            }
            JoinOperator::Inner(ast::JoinConstraint::Using(idents)) => {
                let mut columns = Vec::new();
                for ident in idents {
                    let right = self.lookup_column(&table, &ident.value)?;
                    let mut left = None;
                    for t in &earlier {
                        if let Some(c) = self.lookup_column(t, &ident.value)? {
                            left = Some(c);
                            break;
                        }
                    }
                    match (left, right) {
                        (Some(l), Some(r)) => {
                            Self::check_comparable(&l, &r)?;
                            columns.push(ident.value.clone());
                        }
                        _ => {
                            return Err(DbError::ValidationError(format!(
                                "USING column {} must exist on both sides of the join",
                                ident.value
                            )));
                        }
                    }
                }
                JoinConstraint::Using(columns)
            }
            JoinOperator::Inner(ast::JoinConstraint::None) | JoinOperator::CrossJoin => {
                JoinConstraint::Cross
            }
            JoinOperator::Inner(ast::JoinConstraint::Natural) => {
                return Err(DbError::ValidationError(String::from(
                    "Natural joins not supported",
                )));
            }
            JoinOperator::LeftOuter(_)
            | JoinOperator::RightOuter(_)
            | JoinOperator::FullOuter(_) => {
                return Err(DbError::ValidationError(String::from(
                    "Outer joins not supported",
                )));
            }
            _ => {
                return Err(DbError::ValidationError(String::from(
                    "Unsupported join type",
                )));
            }
        };
        Ok(JoinClause::new(&table, constraint))
    }

    /// Splits an AND chain into predicates.
    ///
    /// # Arguments
    ///
    /// * `expr` - Condition of a WHERE or ON clause.
    fn process_conjunction(&self, expr: &Expr) -> Result<Vec<Predicate>, DbError> {
        let mut predicates = Vec::new();
        for conjunct in Self::conjuncts(expr)? {
            predicates.push(self.process_binary_op(conjunct)?);
        }
        Ok(predicates)
    }

    fn conjuncts(expr: &Expr) -> Result<Vec<&Expr>, DbError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                let mut conjuncts = Self::conjuncts(left)?;
                conjuncts.extend(Self::conjuncts(right)?);
                Ok(conjuncts)
            }
            Expr::BinaryOp {
                op: BinaryOperator::Or,
                ..
            } => Err(DbError::ValidationError(String::from(
                "OR predicates not supported",
            ))),
            Expr::Nested(inner) => Self::conjuncts(inner),
            _ => Ok(vec![expr]),
        }
    }

    /// Parses a comparison to a predicate. A literal on the left is swapped to the right.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to parse.
    fn process_binary_op(&self, expr: &Expr) -> Result<Predicate, DbError> {
        match expr {
            Expr::BinaryOp { left, op, right } => {
                let comparator = Self::binary_operator_to_predicate(op)?;
                match (self.expr_to_pred_expr(left)?, self.expr_to_pred_expr(right)?) {
                    (PredExpr::Column(l), PredExpr::Column(r)) => {
                        Self::check_comparable(&l, &r)?;
                        Ok(Predicate::new(
                            &l.name,
                            comparator,
                            Operand::Column(r.name),
                        ))
                    }
                    (PredExpr::Column(c), PredExpr::Literal(v)) => {
                        Self::check_literal(c.dtype, &v, &c.name)?;
                        Ok(Predicate::literal(&c.name, comparator, &v))
                    }
                    (PredExpr::Literal(v), PredExpr::Column(c)) => {
                        Self::check_literal(c.dtype, &v, &c.name)?;
                        Ok(Predicate::literal(&c.name, comparator.flip(), &v))
                    }
                    (PredExpr::Literal(_), PredExpr::Literal(_)) => {
                        Err(DbError::ValidationError(String::from(
                            "Only predicates with at least one identifier are supported",
                        )))
                    }
                }
            }
            Expr::Nested(inner) => self.process_binary_op(inner),
            _ => Err(DbError::ValidationError(String::from(
                "Unsupported binary operation",
            ))),
        }
    }

    /// Parses the HAVING clause, `AGG(col) op literal [AND ..]`.
    fn process_having(&self, expr: &Expr) -> Result<Vec<AggregatePredicate>, DbError> {
        let mut predicates = Vec::new();
        for conjunct in Self::conjuncts(expr)? {
            let (left, op, right) = match conjunct {
                Expr::BinaryOp { left, op, right } => (left, op, right),
                _ => {
                    return Err(DbError::ValidationError(String::from(
                        "Unsupported HAVING expression",
                    )));
                }
            };
            let comparator = Self::binary_operator_to_predicate(op)?;
            let (function, literal, comparator) = match (&**left, &**right) {
                (Expr::Function(f), other) => (f, other, comparator),
                (other, Expr::Function(f)) => (f, other, comparator.flip()),
                _ => {
                    return Err(DbError::ValidationError(String::from(
                        "HAVING predicates must compare an aggregate",
                    )));
                }
            };
            let aggregate = self.function_to_aggregate(function)?;
            let value = match self.expr_to_pred_expr(literal)? {
                PredExpr::Literal(v) => v,
                PredExpr::Column(_) => {
                    return Err(DbError::ValidationError(String::from(
                        "HAVING predicates must compare an aggregate with a literal",
                    )));
                }
            };
            let result_type = if aggregate.agg == AggOp::Count || aggregate.agg.needs_numeric() {
                DataType::Number
            } else {
                self.disambiguate_name(aggregate.column.split('.').collect())?
                    .dtype
            };
            Self::check_literal(result_type, &value, &aggregate.to_string())?;
            predicates.push(AggregatePredicate::new(
                aggregate.agg,
                &aggregate.column,
                comparator,
                &value,
            ));
        }
        Ok(predicates)
    }

    /// Parses the non-operator parts of the expression to predicate expressions.
    ///
    /// # Arguments
    ///
    /// * `expr` - Non-operator part of the expression to parse.
    fn expr_to_pred_expr(&self, expr: &Expr) -> Result<PredExpr, DbError> {
        match expr {
            Expr::Value(val) => Ok(PredExpr::Literal(Self::value_to_literal(val)?)),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } => match &**expr {
                Expr::Value(Value::Number(s, _)) => Ok(PredExpr::Literal(format!("-{}", s))),
                _ => Err(DbError::ValidationError(String::from(
                    "Unsupported literal in predicate",
                ))),
            },
            Expr::Nested(inner) => self.expr_to_pred_expr(inner),
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                Ok(PredExpr::Column(self.expr_to_column(expr)?))
            }
            _ => Err(DbError::ValidationError(format!(
                "Unsupported expression {} in predicate",
                expr
            ))),
        }
    }

    fn value_to_literal(val: &Value) -> Result<String, DbError> {
        match val {
            Value::Number(s, _) => Ok(s.clone()),
            Value::SingleQuotedString(s) => Ok(format!("'{}'", s)),
            _ => Err(DbError::ValidationError(String::from(
                "Unsupported literal in predicate",
            ))),
        }
    }

    /// Prases binary operator to predicate operators.
    ///
    /// # Arguments
    ///
    /// * `op` - Binary operator to parse.
    fn binary_operator_to_predicate(op: &BinaryOperator) -> Result<Comparator, DbError> {
        match op {
            BinaryOperator::Gt => Ok(Comparator::GreaterThan),
            BinaryOperator::Lt => Ok(Comparator::LessThan),
            BinaryOperator::GtEq => Ok(Comparator::GreaterThanOrEq),
            BinaryOperator::LtEq => Ok(Comparator::LessThanOrEq),
            BinaryOperator::Eq => Ok(Comparator::Equals),
            BinaryOperator::NotEq => Ok(Comparator::NotEq),
            BinaryOperator::Or => Err(DbError::ValidationError(String::from(
                "OR predicates not supported",
            ))),
            _ => Err(DbError::ValidationError(String::from(
                "Unsupported binary operation",
            ))),
        }
    }

    fn check_comparable(left: &ResolvedColumn, right: &ResolvedColumn) -> Result<(), DbError> {
        if left.dtype != right.dtype {
            return Err(DbError::ValidationError(format!(
                "Cannot compare {} ({}) with {} ({})",
                left.name, left.dtype, right.name, right.dtype
            )));
        }
        Ok(())
    }

    /// NUMBER columns compare with numbers, CHAR and DATE columns with quoted strings.
    fn check_literal(dtype: DataType, literal: &str, field: &str) -> Result<(), DbError> {
        let quoted = literal.starts_with('\'');
        let ok = match dtype {
            DataType::Number => !quoted,
            DataType::Char | DataType::Date => quoted,
        };
        if ok {
            Ok(())
        } else {
            Err(DbError::ValidationError(format!(
                "Cannot compare {} field {} with {}",
                dtype, field, literal
            )))
        }
    }

    /// Validates that an aggregate operation is valid for the type of field.
    ///
    /// # Arguments
    ///
    /// * `agg` - Aggregate operation.
    /// * `column` - Aggregated column.
    fn validate_aggregate(agg: AggOp, column: &ResolvedColumn) -> Result<(), DbError> {
        if agg.needs_numeric() && column.dtype != DataType::Number {
            return Err(DbError::ValidationError(format!(
                "Cannot perform operation {} on field {}",
                agg, column.name,
            )));
        }
        Ok(())
    }

    fn expr_to_select_item(&self, expr: &Expr) -> Result<SelectItem, DbError> {
        match expr {
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                Ok(SelectItem::Column(self.expr_to_column(expr)?.name))
            }
            Expr::Function(f) => Ok(SelectItem::Aggregate(self.function_to_aggregate(f)?)),
            _ => Err(DbError::ValidationError(String::from(
                "Select unsupported expression",
            ))),
        }
    }

    /// Converts an aggregate call such as `SUM(Amount)` or `COUNT(*)`.
    fn function_to_aggregate(&self, function: &Function) -> Result<AggregateColumn, DbError> {
        let Function {
            name,
            args,
            distinct,
            over,
            ..
        } = function;
        let agg = AggOp::from_name(&get_name(name)?).ok_or_else(|| {
            DbError::ValidationError(format!("Unsupported SQL function {}", name))
        })?;
        if *distinct || over.is_some() {
            return Err(DbError::ValidationError(format!(
                "DISTINCT and window aggregates not supported in {}",
                name
            )));
        }
        if args.len() != 1 {
            return Err(DbError::ValidationError(format!(
                "Wrong number of args in {} operation",
                name
            )));
        }
        match &args[0] {
            FunctionArg::Unnamed(FunctionArgExpr::Wildcard) if agg == AggOp::Count => {
                Ok(AggregateColumn::new(agg, "*"))
            }
            FunctionArg::Unnamed(FunctionArgExpr::Expr(
                expr @ (Expr::Identifier(_) | Expr::CompoundIdentifier(_)),
            )) => {
                let column = self.expr_to_column(expr)?;
                Self::validate_aggregate(agg, &column)?;
                Ok(AggregateColumn::new(agg, &column.name))
            }
            _ => Err(DbError::ValidationError(String::from(
                "Aggregate over unsupported expression",
            ))),
        }
    }

    /// Converts a sqlparser::ast::Expr naming a column to a resolved column.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to be converted.
    fn expr_to_column(&self, expr: &Expr) -> Result<ResolvedColumn, DbError> {
        match expr {
            Expr::Identifier(name) => self.disambiguate_name(vec![name.value.as_str()]),
            Expr::CompoundIdentifier(names) => {
                self.disambiguate_name(names.iter().map(|s| s.value.as_str()).collect())
            }
            _ => Err(DbError::ValidationError(format!(
                "Expected a column, found {}",
                expr
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::*;
    use sqlparser::ast::Statement;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn translate(sql: &str) -> Result<QueryStatement, DbError> {
        init();
        let db = sample_database();
        let ast = Parser::parse_sql(&GenericDialect {}, sql)?;
        match &ast[0] {
            Statement::Query(query) => TranslateAndValidate::from_sql(query, &db),
            _ => panic!("not a query: {}", sql),
        }
    }

    fn assert_rejected(sql: &str) {
        match translate(sql) {
            Err(DbError::ValidationError(_)) => {}
            other => panic!("{} should be rejected, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_simple_select() {
        let stmt = translate("select firstname from customers where customerid = 1").unwrap();
        assert_eq!(
            vec![SelectItem::Column(String::from("Customers.FirstName"))],
            stmt.select
        );
        assert_eq!(vec![String::from("Customers")], stmt.from);
        assert_eq!(
            vec![Predicate::literal(
                "Customers.CustomerID",
                Comparator::Equals,
                "1"
            )],
            stmt.selection
        );
    }

    #[test]
    fn test_wildcard_and_string_literal() {
        let stmt = translate("SELECT * FROM Customers WHERE LastName = 'Smith'").unwrap();
        assert_eq!(vec![SelectItem::Wildcard], stmt.select);
        assert_eq!("'Smith'", stmt.selection[0].operand.to_string());
    }

    #[test]
    fn test_literal_on_left_is_flipped() {
        let stmt = translate("SELECT OrderID FROM Orders WHERE 5 < Amount").unwrap();
        assert_eq!(
            Predicate::literal("Orders.Amount", Comparator::GreaterThan, "5"),
            stmt.selection[0]
        );
    }

    #[test]
    fn test_and_chain() {
        let stmt = translate(
            "SELECT OrderID FROM Orders WHERE Amount >= 10 AND (OrderDate <> '2020-01-01')",
        )
        .unwrap();
        assert_eq!(2, stmt.selection.len());
        assert_eq!(Comparator::NotEq, stmt.selection[1].comparator);
    }

    #[test]
    fn test_joins() {
        let stmt = translate(
            "SELECT FirstName, Amount FROM Customers \
             INNER JOIN Orders ON Customers.CustomerID = Orders.CustomerID \
             CROSS JOIN Products",
        )
        .unwrap();
        assert_eq!(
            vec!["Customers", "Orders", "Products"],
            stmt.referenced_tables()
        );
        assert_eq!(
            JoinConstraint::On(vec![Predicate::column_eq(
                "Customers.CustomerID",
                "Orders.CustomerID"
            )]),
            stmt.joins[0].constraint
        );
        assert_eq!(JoinConstraint::Cross, stmt.joins[1].constraint);
    }

    #[test]
    fn test_join_using() {
        let stmt =
            translate("SELECT ProductName FROM Products JOIN Suppliers USING (SupplierID)")
                .unwrap();
        assert_eq!(
            JoinConstraint::Using(vec![String::from("SupplierID")]),
            stmt.joins[0].constraint
        );
        assert_rejected("SELECT ProductName FROM Products JOIN Suppliers USING (Country)");
    }

    #[test]
    fn test_comma_separated_tables() {
        let stmt = translate("SELECT FirstName, OrderDate FROM Customers, Orders").unwrap();
        assert_eq!(
            vec![String::from("Customers"), String::from("Orders")],
            stmt.from
        );
        assert!(stmt.joins.is_empty());
    }

    #[test]
    fn test_aggregates() {
        let stmt = translate(
            "SELECT CustomerID, SUM(Amount), COUNT(*) FROM Orders \
             GROUP BY CustomerID HAVING SUM(Amount) > 100",
        )
        .unwrap();
        assert_eq!(
            SelectItem::Aggregate(AggregateColumn::new(AggOp::Sum, "Orders.Amount")),
            stmt.select[1]
        );
        assert_eq!(
            SelectItem::Aggregate(AggregateColumn::new(AggOp::Count, "*")),
            stmt.select[2]
        );
        assert_eq!(vec![String::from("Orders.CustomerID")], stmt.group_by);
        assert_eq!(
            vec![AggregatePredicate::new(
                AggOp::Sum,
                "Orders.Amount",
                Comparator::GreaterThan,
                "100"
            )],
            stmt.having
        );
        assert!(stmt.has_aggregate());
    }

    #[test]
    fn test_having_literal_on_left() {
        let stmt = translate(
            "SELECT CustomerID FROM Orders GROUP BY CustomerID HAVING 3 <= COUNT(OrderID)",
        )
        .unwrap();
        assert_eq!(Comparator::GreaterThanOrEq, stmt.having[0].comparator);
        assert_eq!("Orders.OrderID", stmt.having[0].column);
    }

    #[test]
    fn test_unknown_names() {
        assert_rejected("SELECT * FROM Invoices");
        assert_rejected("SELECT Salary FROM Customers");
        assert_rejected("SELECT Orders.Amount FROM Customers");
    }

    #[test]
    fn test_ambiguous_column() {
        assert_rejected("SELECT CustomerID FROM Customers, Orders");
        assert!(translate("SELECT Orders.CustomerID FROM Customers, Orders").is_ok());
    }

    #[test]
    fn test_unsupported_constructs() {
        assert_rejected("SELECT FirstName FROM Customers WHERE CustomerID = 1 OR CustomerID = 2");
        assert_rejected("SELECT DISTINCT FirstName FROM Customers");
        assert_rejected("SELECT * FROM (SELECT * FROM Customers)");
        assert_rejected("SELECT FirstName FROM Customers UNION SELECT ProductName FROM Products");
        assert_rejected(
            "SELECT FirstName FROM Customers LEFT JOIN Orders ON Customers.CustomerID = Orders.CustomerID",
        );
        assert_rejected("SELECT * FROM Orders, orders");
        assert_rejected("SELECT * FROM Customers c");
        assert_rejected("SELECT FirstName FROM Customers ORDER BY FirstName");
    }

    #[test]
    fn test_grouping_rules() {
        assert_rejected("SELECT OrderDate, SUM(Amount) FROM Orders GROUP BY CustomerID");
        assert_rejected("SELECT *, COUNT(*) FROM Orders");
        assert_rejected("SELECT SUM(LastName) FROM Customers");
        assert_rejected("SELECT AVG(OrderDate) FROM Orders");
        assert!(translate("SELECT MAX(LastName) FROM Customers").is_ok());
    }

    #[test]
    fn test_type_checks() {
        assert_rejected("SELECT * FROM Orders WHERE Amount = 'ten'");
        assert_rejected("SELECT * FROM Customers WHERE LastName = 5");
        assert_rejected("SELECT * FROM Orders WHERE 1 = 1");
        assert_rejected(
            "SELECT * FROM Customers JOIN Orders ON Customers.FirstName = Orders.CustomerID",
        );
        assert!(translate("SELECT * FROM Orders WHERE OrderDate > '2020-01-01'").is_ok());
        assert!(translate("SELECT * FROM Orders WHERE Amount > -5").is_ok());
    }
}
