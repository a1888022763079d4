use crate::DbError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;

/// An Operator represents one relational-algebra step in a query tree.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Operator {
    Relation(RelationNode),
    CartesianProduct,
    InnerJoin(InnerJoinNode),
    SimpleSelection(SimpleSelectionNode),
    CompoundSelection(CompoundSelectionNode),
    AggregateSelection(AggregateSelectionNode),
    Aggregation(AggregationNode),
    Projection(ProjectionNode),
}

/// Type tag of an operator.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Relation,
    CartesianProduct,
    InnerJoin,
    SimpleSelection,
    CompoundSelection,
    AggregateSelection,
    Aggregation,
    Projection,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorKind::Relation => "Relation",
            OperatorKind::CartesianProduct => "CartesianProduct",
            OperatorKind::InnerJoin => "InnerJoin",
            OperatorKind::SimpleSelection => "SimpleSelection",
            OperatorKind::CompoundSelection => "CompoundSelection",
            OperatorKind::AggregateSelection => "AggregateSelection",
            OperatorKind::Aggregation => "Aggregation",
            OperatorKind::Projection => "Projection",
        };
        write!(f, "{}", name)
    }
}

impl Operator {
    /// Returns the type tag of the operator.
    pub fn kind(&self) -> OperatorKind {
        match self {
            Operator::Relation(_) => OperatorKind::Relation,
            Operator::CartesianProduct => OperatorKind::CartesianProduct,
            Operator::InnerJoin(_) => OperatorKind::InnerJoin,
            Operator::SimpleSelection(_) => OperatorKind::SimpleSelection,
            Operator::CompoundSelection(_) => OperatorKind::CompoundSelection,
            Operator::AggregateSelection(_) => OperatorKind::AggregateSelection,
            Operator::Aggregation(_) => OperatorKind::Aggregation,
            Operator::Projection(_) => OperatorKind::Projection,
        }
    }

    /// Number of children the operator takes.
    pub fn arity(&self) -> usize {
        match self {
            Operator::Relation(_) => 0,
            Operator::CartesianProduct | Operator::InnerJoin(_) => 2,
            Operator::SimpleSelection(_)
            | Operator::CompoundSelection(_)
            | Operator::AggregateSelection(_)
            | Operator::Aggregation(_)
            | Operator::Projection(_) => 1,
        }
    }

    /// True for the two-input operators.
    pub fn is_binary(&self) -> bool {
        self.arity() == 2
    }

    /// Every column name the operator reads or outputs, in the order it lists them.
    ///
    /// Join operands are included; literals and the `*` of `COUNT(*)` are not.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        match self {
            Operator::Relation(_) | Operator::CartesianProduct => {}
            Operator::InnerJoin(join) => {
                columns.push(join.left_column.as_str());
                columns.push(join.right_column.as_str());
            }
            Operator::SimpleSelection(sel) => sel.predicate.push_columns(&mut columns),
            Operator::CompoundSelection(sel) => {
                for pred in &sel.predicates {
                    pred.push_columns(&mut columns);
                }
            }
            Operator::AggregateSelection(sel) => {
                for pred in &sel.predicates {
                    if pred.column != "*" {
                        columns.push(pred.column.as_str());
                    }
                }
            }
            Operator::Aggregation(agg) => {
                columns.extend(agg.group_by.iter().map(|c| c.as_str()));
                for a in &agg.aggregates {
                    if a.column != "*" {
                        columns.push(a.column.as_str());
                    }
                }
            }
            Operator::Projection(proj) => columns.extend(proj.columns.iter().map(|c| c.as_str())),
        }
        columns
    }

    /// Table name of a Relation operator.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Operator::Relation(rel) => Some(&rel.table_name),
            _ => None,
        }
    }

    /// Creates a Relation operator.
    pub fn relation(table_name: &str) -> Self {
        Operator::Relation(RelationNode {
            table_name: table_name.to_string(),
        })
    }

    /// Creates a Projection operator.
    pub fn projection(columns: Vec<String>) -> Self {
        Operator::Projection(ProjectionNode { columns })
    }

    /// Creates a SimpleSelection operator.
    pub fn selection(predicate: Predicate) -> Self {
        Operator::SimpleSelection(SimpleSelectionNode { predicate })
    }

    /// Creates an InnerJoin operator.
    pub fn inner_join(left_column: &str, right_column: &str) -> Self {
        Operator::InnerJoin(InnerJoinNode {
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Relation(rel) => write!(f, "{}", rel.table_name),
            Operator::CartesianProduct => write!(f, "CROSS"),
            Operator::InnerJoin(join) => {
                write!(f, "JOIN[{} = {}]", join.left_column, join.right_column)
            }
            Operator::SimpleSelection(sel) => write!(f, "SELECT[{}]", sel.predicate),
            Operator::CompoundSelection(sel) => {
                write!(f, "SELECT[{}]", join_display(&sel.predicates, " AND "))
            }
            Operator::AggregateSelection(sel) => {
                write!(f, "HAVING[{}]", join_display(&sel.predicates, " AND "))
            }
            Operator::Aggregation(agg) => {
                write!(f, "AGGREGATE[")?;
                if !agg.group_by.is_empty() {
                    write!(f, "group: {}; ", agg.group_by.join(", "))?;
                }
                write!(f, "{}]", join_display(&agg.aggregates, ", "))
            }
            Operator::Projection(proj) => write!(f, "PROJECT[{}]", proj.columns.join(", ")),
        }
    }
}

fn join_display<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Leaf node naming one base table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RelationNode {
    pub table_name: String,
}

/// Equi-join `left_column = right_column`. Both sides are qualified as `Table.Column`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InnerJoinNode {
    pub left_column: String,
    pub right_column: String,
}

/// Filter on a single predicate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SimpleSelectionNode {
    pub predicate: Predicate,
}

/// Conjunction of simple predicates.
///
/// The predicate list is never empty; build it with [`CompoundSelectionNode::new`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompoundSelectionNode {
    predicates: Vec<Predicate>,
}

impl CompoundSelectionNode {
    /// Creates a compound selection.
    ///
    /// # Arguments
    ///
    /// * `predicates` - ANDed predicates, at least one.
    pub fn new(predicates: Vec<Predicate>) -> Result<Self, DbError> {
        if predicates.is_empty() {
            return Err(DbError::DbError(String::from(
                "Compound selection needs at least one predicate",
            )));
        }
        Ok(Self { predicates })
    }

    /// Creates a compound selection from positionally aligned lists.
    pub fn from_parallel(
        columns: Vec<String>,
        comparators: Vec<Comparator>,
        values: Vec<Operand>,
    ) -> Result<Self, DbError> {
        if columns.len() != comparators.len() || columns.len() != values.len() {
            return Err(DbError::DbError(format!(
                "Compound selection lists differ in length: {} columns, {} comparators, {} values",
                columns.len(),
                comparators.len(),
                values.len()
            )));
        }
        let predicates = columns
            .into_iter()
            .zip(comparators)
            .zip(values)
            .map(|((column, comparator), operand)| Predicate::new(&column, comparator, operand))
            .collect();
        Self::new(predicates)
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.predicates.iter().map(|p| p.column.as_str())
    }

    /// Consumes the node, returning its predicates in order.
    pub fn into_predicates(self) -> Vec<Predicate> {
        self.predicates
    }
}

/// HAVING clause: conjunction of predicates over aggregates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregateSelectionNode {
    pub predicates: Vec<AggregatePredicate>,
}

/// Grouping and aggregate computation. `group_by` may be empty for a whole-table aggregate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AggregationNode {
    pub group_by: Vec<String>,
    pub aggregates: Vec<AggregateColumn>,
}

/// Projection node.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProjectionNode {
    /// Output columns, in order.
    pub columns: Vec<String>,
}

/// Right-hand side of a predicate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// A column reference. Selections over two columns of different tables are join predicates.
    Column(String),
    /// A literal, kept as written (string literals keep their quotes).
    Literal(String),
}

impl Operand {
    /// Classifies a raw value token: quoted strings and numbers are literals, dotted names are columns.
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.starts_with('\'') || token.parse::<f64>().is_ok() || !token.contains('.') {
            Operand::Literal(token.to_string())
        } else {
            Operand::Column(token.to_string())
        }
    }

    /// Returns the column name of a column operand.
    pub fn column(&self) -> Option<&str> {
        match self {
            Operand::Column(c) => Some(c),
            Operand::Literal(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(s) | Operand::Literal(s) => write!(f, "{}", s),
        }
    }
}

/// Predicate `column comparator operand`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub column: String,
    pub comparator: Comparator,
    pub operand: Operand,
}

impl Predicate {
    /// Create a new predicate.
    ///
    /// # Arguments
    ///
    /// * `column` - Left-hand column.
    /// * `comparator` - Comparison operator.
    /// * `operand` - Right-hand column or literal.
    pub fn new(column: &str, comparator: Comparator, operand: Operand) -> Self {
        Self {
            column: column.to_string(),
            comparator,
            operand,
        }
    }

    /// Predicate against a literal.
    pub fn literal(column: &str, comparator: Comparator, value: &str) -> Self {
        Self::new(column, comparator, Operand::Literal(value.to_string()))
    }

    /// Equality between two columns.
    pub fn column_eq(column: &str, other: &str) -> Self {
        Self::new(column, Comparator::Equals, Operand::Column(other.to_string()))
    }

    fn push_columns<'a>(&'a self, columns: &mut Vec<&'a str>) {
        columns.push(self.column.as_str());
        if let Operand::Column(c) = &self.operand {
            columns.push(c.as_str());
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.comparator, self.operand)
    }
}

/// Comparison operators.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Equals,
    NotEq,
    GreaterThan,
    LessThan,
    GreaterThanOrEq,
    LessThanOrEq,
}

impl Comparator {
    /// Flip the operator, for swapping its operands.
    pub fn flip(&self) -> Self {
        match self {
            Comparator::GreaterThan => Comparator::LessThan,
            Comparator::LessThan => Comparator::GreaterThan,
            Comparator::LessThanOrEq => Comparator::GreaterThanOrEq,
            Comparator::GreaterThanOrEq => Comparator::LessThanOrEq,
            op => *op,
        }
    }

    /// Parses `=`, `!=`/`<>`, `>`, `<`, `>=`, `<=`.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Comparator::Equals),
            "!=" | "<>" => Some(Comparator::NotEq),
            ">" => Some(Comparator::GreaterThan),
            "<" => Some(Comparator::LessThan),
            ">=" => Some(Comparator::GreaterThanOrEq),
            "<=" => Some(Comparator::LessThanOrEq),
            _ => None,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::Equals => "=",
            Comparator::NotEq => "!=",
            Comparator::GreaterThan => ">",
            Comparator::LessThan => "<",
            Comparator::GreaterThanOrEq => ">=",
            Comparator::LessThanOrEq => "<=",
        };
        write!(f, "{}", symbol)
    }
}

/// Aggregation operations.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggOp {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggOp {
    /// Parses an aggregate function name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match &name.to_uppercase()[..] {
            "AVG" => Some(AggOp::Avg),
            "COUNT" => Some(AggOp::Count),
            "MAX" => Some(AggOp::Max),
            "MIN" => Some(AggOp::Min),
            "SUM" => Some(AggOp::Sum),
            _ => None,
        }
    }

    /// True for aggregates that only make sense over NUMBER columns.
    pub fn needs_numeric(&self) -> bool {
        matches!(self, AggOp::Avg | AggOp::Sum)
    }
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op_str = match self {
            AggOp::Avg => "AVG",
            AggOp::Count => "COUNT",
            AggOp::Max => "MAX",
            AggOp::Min => "MIN",
            AggOp::Sum => "SUM",
        };
        write!(f, "{}", op_str)
    }
}

/// An aggregate applied to a column, e.g. `COUNT(Orders.OrderID)`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct AggregateColumn {
    pub agg: AggOp,
    /// Column name, or `*` for `COUNT(*)`.
    pub column: String,
}

impl AggregateColumn {
    pub fn new(agg: AggOp, column: &str) -> Self {
        Self {
            agg,
            column: column.to_string(),
        }
    }

    /// Same aggregate over the same column, ignoring case.
    pub fn matches(&self, other: &AggregateColumn) -> bool {
        self.agg == other.agg && self.column.eq_ignore_ascii_case(&other.column)
    }
}

impl fmt::Display for AggregateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.agg, self.column)
    }
}

/// HAVING predicate `agg(column) comparator value`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct AggregatePredicate {
    pub agg: AggOp,
    pub column: String,
    pub comparator: Comparator,
    pub value: String,
}

impl AggregatePredicate {
    pub fn new(agg: AggOp, column: &str, comparator: Comparator, value: &str) -> Self {
        Self {
            agg,
            column: column.to_string(),
            comparator,
            value: value.to_string(),
        }
    }

    /// The aggregate this predicate filters on.
    pub fn aggregate(&self) -> AggregateColumn {
        AggregateColumn::new(self.agg, &self.column)
    }
}

impl fmt::Display for AggregatePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} {}",
            self.agg, self.column, self.comparator, self.value
        )
    }
}
