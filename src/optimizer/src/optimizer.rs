use crate::config::OptimizerConfig;
use crate::support;
use common::catalog::Catalog;
use common::query_tree::Direction::{Down, Left, Right, Up};
use common::query_tree::{
    AggregateColumn, AggregatePredicate, AggregateSelectionNode, AggregationNode, Comparator,
    CompoundSelectionNode, Direction, Operator, OperatorKind, Predicate, QueryTree, TraversalPath,
};
use common::statement::{JoinConstraint, QueryStatement, SelectItem};
use common::table::Table;
use common::DbError;
use std::sync::Arc;

/// Names of the stages, in the order their snapshots are recorded.
pub const STAGE_NAMES: [&str; 7] = [
    "create query tree",
    "cascade selections",
    "push down selections",
    "cascade and push down projections",
    "form joins",
    "rearrange leaf nodes",
    "find subtrees to pipeline",
];

/// Heuristic optimizer for one validated SELECT statement.
///
/// `optimize` builds the initial tree and rewrites it stage by stage, keeping a copy of the
/// tree after every stage.
pub struct Optimizer {
    /// Referenced tables, in FROM/JOIN order.
    scope: Vec<Arc<Table>>,
    statement: QueryStatement,
    snapshots: Vec<QueryTree>,
    /// Equality predicates between two tables, found while pushing selections down.
    join_predicates: Vec<Predicate>,
    config: OptimizerConfig,
}

impl Optimizer {
    /// Creates an optimizer over a snapshot of the catalog.
    ///
    /// # Arguments
    ///
    /// * `catalog` - Catalog the statement was validated against.
    /// * `statement` - Statement to plan.
    pub fn new<C: Catalog>(catalog: &C, statement: QueryStatement) -> Result<Self, DbError> {
        let tables = catalog.snapshot()?;
        let mut scope = Vec::new();
        for name in statement.referenced_tables() {
            let table = tables
                .iter()
                .find(|t| t.is_named(name))
                .ok_or_else(|| DbError::RelationNotFound(name.to_string()))?;
            scope.push(table.clone());
        }
        Ok(Optimizer {
            scope,
            statement,
            snapshots: Vec::new(),
            join_predicates: Vec::new(),
            config: OptimizerConfig::default(),
        })
    }

    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables the join-forming stage.
    pub fn set_join_optimization(&mut self, enabled: bool) {
        self.config.join_optimization = enabled;
    }

    pub fn config(&self) -> OptimizerConfig {
        self.config
    }

    pub fn statement(&self) -> &QueryStatement {
        &self.statement
    }

    /// Trees recorded by the last `optimize` call, one per stage.
    pub fn snapshots(&self) -> &[QueryTree] {
        &self.snapshots
    }

    /// The plan handed to execution.
    pub fn final_tree(&self) -> Option<&QueryTree> {
        self.snapshots.last()
    }

    /// Equality join predicates found by the last run.
    pub fn join_predicates(&self) -> &[Predicate] {
        &self.join_predicates
    }

    /// Runs every stage and returns the seven snapshots.
    ///
    /// Any error aborts the run. Errors are contract faults of the caller (see
    /// [`DbError::is_structural_fault`] and [`DbError::is_lookup_miss`]).
    pub fn optimize(&mut self) -> Result<&[QueryTree], DbError> {
        info!(
            "Optimizing query over {} table(s)",
            self.statement.referenced_tables().len()
        );
        self.snapshots.clear();
        self.join_predicates.clear();
        if let Err(e) = self.run_stages() {
            error!(
                "Optimizer aborted after {} of {} stages: {}",
                self.snapshots.len(),
                STAGE_NAMES.len(),
                e
            );
            return Err(e);
        }
        info!(
            "Optimized plan: {}",
            self.final_tree().map(|t| t.to_string()).unwrap_or_default()
        );
        Ok(&self.snapshots)
    }

    fn run_stages(&mut self) -> Result<(), DbError> {
        let mut tree = self.create_query_tree()?;
        self.record(&tree);
        self.cascade_selections(&mut tree)?;
        self.record(&tree);
        self.push_down_selections(&mut tree)?;
        self.record(&tree);
        self.cascade_and_push_down_projections(&mut tree)?;
        self.record(&tree);
        self.form_joins(&mut tree)?;
        self.record(&tree);
        self.rearrange_leaf_nodes(&mut tree);
        self.record(&tree);
        self.find_subtrees_to_pipeline(&mut tree)?;
        self.record(&tree);
        Ok(())
    }

    fn record(&mut self, tree: &QueryTree) {
        let stage = STAGE_NAMES.get(self.snapshots.len()).unwrap_or(&"extra");
        debug!("Stage {}: {} nodes", stage, tree.size());
        self.snapshots.push(tree.deep_copy());
    }

    fn qualify_aggregate(&self, column: &str) -> Result<String, DbError> {
        if column == "*" {
            Ok(column.to_string())
        } else {
            support::qualify(column, &self.scope)
        }
    }

    /// Builds the tree straight from the clauses: root, HAVING, WHERE, then the FROM products.
    fn create_query_tree(&self) -> Result<QueryTree, DbError> {
        let stmt = &self.statement;
        let root = if stmt.has_aggregate() {
            let mut group_by = Vec::new();
            for column in stmt.group_by_columns() {
                let qualified = support::qualify(column, &self.scope)?;
                support::merge_columns(&mut group_by, vec![qualified.as_str()]);
            }
            let mut aggregates = Vec::new();
            for item in stmt.select_items() {
                if let SelectItem::Aggregate(agg) = item {
                    let column = self.qualify_aggregate(&agg.column)?;
                    aggregates.push(AggregateColumn::new(agg.agg, &column));
                }
            }
            Operator::Aggregation(AggregationNode {
                group_by,
                aggregates,
            })
        } else {
            let mut columns = Vec::new();
            for item in stmt.select_items() {
                match item {
                    SelectItem::Wildcard => columns.extend(support::expand_wildcard(&self.scope)),
                    SelectItem::Column(c) => columns.push(support::qualify(c, &self.scope)?),
                    SelectItem::Aggregate(_) => {}
                }
            }
            Operator::projection(columns)
        };
        let mut tree = QueryTree::new(root);

        if !stmt.having_predicates().is_empty() {
            let mut predicates = Vec::new();
            for pred in stmt.having_predicates() {
                let column = self.qualify_aggregate(&pred.column)?;
                predicates.push(AggregatePredicate::new(
                    pred.agg,
                    &column,
                    pred.comparator,
                    &pred.value,
                ));
            }
            // Aggregates filtered by HAVING must be computed below it. They join the
            // aggregate list; adding them to the grouping would change the groups.
            if let Operator::Aggregation(mut agg) = tree.root_operator()?.clone() {
                for pred in &predicates {
                    let needed = pred.aggregate();
                    if !agg.aggregates.iter().any(|a| a.matches(&needed)) {
                        agg.aggregates.push(needed);
                    }
                }
                tree.set(&[], Direction::None, Operator::Aggregation(agg))?;
            }
            tree.add(
                &[],
                Up,
                Operator::AggregateSelection(AggregateSelectionNode { predicates }),
            )?;
        }

        let mut selection = Vec::new();
        for pred in stmt.where_predicates() {
            selection.push(support::qualify_predicate(pred, &self.scope)?);
        }
        if let Some(op) = selection_operator(selection)? {
            let bottom = bottom_path(&tree);
            tree.add(&bottom, Down, op)?;
        }

        // Left-deep product over the FROM and JOIN tables.
        let bottom = bottom_path(&tree);
        let (first, rest) = self
            .scope
            .split_first()
            .ok_or_else(|| DbError::ValidationError(String::from("Query has no FROM table")))?;
        tree.add(&bottom, Down, Operator::relation(&first.name))?;
        let mut skeleton = bottom.clone();
        skeleton.push(Down);
        for table in rest {
            tree.add(&skeleton, Up, Operator::CartesianProduct)?;
            tree.add(&skeleton, Right, Operator::relation(&table.name))?;
        }

        let join_preds = self.join_clause_predicates()?;
        if !join_preds.is_empty() {
            match tree.get(&bottom, Direction::None)?.clone() {
                Operator::SimpleSelection(sel) => {
                    let mut predicates = vec![sel.predicate];
                    predicates.extend(join_preds);
                    let compound = CompoundSelectionNode::new(predicates)?;
                    tree.set(&bottom, Direction::None, Operator::CompoundSelection(compound))?;
                }
                Operator::CompoundSelection(sel) => {
                    let mut predicates = sel.into_predicates();
                    predicates.extend(join_preds);
                    let compound = CompoundSelectionNode::new(predicates)?;
                    tree.set(&bottom, Direction::None, Operator::CompoundSelection(compound))?;
                }
                _ => {
                    if let Some(op) = selection_operator(join_preds)? {
                        tree.add(&bottom, Down, op)?;
                    }
                }
            }
        }
        Ok(tree)
    }

    /// Predicates of the ON and USING clauses, in clause order.
    fn join_clause_predicates(&self) -> Result<Vec<Predicate>, DbError> {
        let offset = self.statement.from_tables().len();
        let mut predicates = Vec::new();
        for (i, join) in self.statement.join_clauses().iter().enumerate() {
            let joined = self.scope.get(offset + i).ok_or_else(|| {
                DbError::RelationNotFound(join.table.clone())
            })?;
            match &join.constraint {
                JoinConstraint::On(preds) => {
                    for pred in preds {
                        predicates.push(support::qualify_predicate(pred, &self.scope)?);
                    }
                }
                JoinConstraint::Using(columns) => {
                    let earlier = &self.scope[..offset + i];
                    for column in columns {
                        let left = support::qualify(column, earlier)?;
                        let right =
                            support::qualify(&format!("{}.{}", joined.name, column), &self.scope)?;
                        predicates.push(Predicate::column_eq(&left, &right));
                    }
                }
                JoinConstraint::Cross => {}
            }
        }
        Ok(predicates)
    }

    /// Splits every compound selection into a chain of simple selections, first predicate on top.
    fn cascade_selections(&self, tree: &mut QueryTree) -> Result<(), DbError> {
        loop {
            let found = tree.locations().into_iter().find_map(|(path, op)| match op {
                Operator::CompoundSelection(c) => Some((path, c.clone())),
                _ => None,
            });
            let (path, compound) = match found {
                Some(found) => found,
                None => return Ok(()),
            };
            let mut predicates = compound.into_predicates().into_iter();
            let first = match predicates.next() {
                Some(first) => first,
                None => return Ok(()),
            };
            let rest: Vec<Predicate> = predicates.collect();
            tree.set(&path, Direction::None, Operator::selection(first))?;
            for pred in rest.into_iter().rev() {
                tree.add(&path, Down, Operator::selection(pred))?;
            }
        }
    }

    /// Moves local selections onto their relation and join selections onto the
    /// innermost product holding both tables.
    fn push_down_selections(&mut self, tree: &mut QueryTree) -> Result<(), DbError> {
        let mut pending = Vec::new();
        let mut path: TraversalPath = Vec::new();
        loop {
            let op = tree.get(&path, Direction::None)?;
            if let Operator::SimpleSelection(sel) = op {
                let pred = sel.predicate.clone();
                tree.remove(&path, Direction::None)?;
                pending.push(pred);
            } else if op.arity() == 1 && tree.get(&path, Down).is_ok() {
                path.push(Down);
            } else {
                break;
            }
        }

        let pairs = support::relation_pairs(&self.scope);
        for pred in pending {
            match support::join_tables(&pred) {
                Some((a, b)) => {
                    if !support::contains_pair(&pairs, a, b) {
                        return Err(DbError::RelationNotFound(format!(
                            "{} joins a table outside the query",
                            pred
                        )));
                    }
                    let target = join_location(tree, a, b)?;
                    tree.add(&target, Up, Operator::selection(pred.clone()))?;
                    if pred.comparator == Comparator::Equals {
                        self.join_predicates.push(pred);
                    }
                }
                None => {
                    let target = tree.get_relation_location(support::table_of(&pred.column))?;
                    tree.add(&target, Up, Operator::selection(pred))?;
                }
            }
        }
        Ok(())
    }

    /// Adds projections that drop unused columns before they reach the upper products.
    ///
    /// Only trees with two or more products are touched.
    fn cascade_and_push_down_projections(&self, tree: &mut QueryTree) -> Result<(), DbError> {
        if tree.get_type_occurrence(OperatorKind::CartesianProduct) <= 1 {
            return Ok(());
        }

        for table in &self.scope {
            let relation = tree.get_relation_location(&table.name)?;
            let referenced = ancestor_columns(tree, &relation)?;
            let columns = support::columns_of_table(table, referenced.iter().map(|c| c.as_str()));
            if columns.is_empty() {
                continue;
            }
            if let Some(top) = branch_top(tree, &relation)? {
                tree.add(&top, Up, Operator::projection(columns))?;
            }
        }

        // Cumulative projections under each product whose input is another product.
        let mut inner = Vec::new();
        for (path, op) in tree.locations() {
            if !op.is_binary() {
                continue;
            }
            for side in &[Left, Right] {
                let mut child = path.clone();
                child.push(*side);
                if leads_to_binary(tree, &child)? {
                    inner.push(child);
                }
            }
        }
        inner.sort_by(|a, b| b.len().cmp(&a.len()));
        for child in inner {
            let referenced = ancestor_columns(tree, &child)?;
            let mut columns = Vec::new();
            for table in &self.scope {
                let below = tree
                    .get_relation_location(&table.name)
                    .map_or(false, |p| p.starts_with(&child));
                if below {
                    columns.extend(support::columns_of_table(
                        table,
                        referenced.iter().map(|c| c.as_str()),
                    ));
                }
            }
            if !columns.is_empty() {
                tree.add(&child, Up, Operator::projection(columns))?;
            }
        }
        Ok(())
    }

    /// Turns each product that sits right under one of its equality join selections into an
    /// inner join and drops the selection.
    fn form_joins(&self, tree: &mut QueryTree) -> Result<(), DbError> {
        if !self.config.join_optimization {
            debug!("Join optimization disabled");
            return Ok(());
        }
        loop {
            let found = tree.locations().into_iter().find_map(|(path, op)| match op {
                Operator::SimpleSelection(sel) if self.join_predicates.contains(&sel.predicate) => {
                    let mut below = path.clone();
                    below.push(Down);
                    match tree.get(&below, Direction::None) {
                        Ok(Operator::CartesianProduct) => Some((path, sel.predicate.clone())),
                        _ => None,
                    }
                }
                _ => None,
            });
            let (path, pred) = match found {
                Some(found) => found,
                None => return Ok(()),
            };
            let right = pred
                .operand
                .column()
                .map(String::from)
                .ok_or_else(|| DbError::DbError(format!("{} is not a join predicate", pred)))?;
            let mut below = path.clone();
            below.push(Down);
            tree.set(
                &below,
                Direction::None,
                Operator::inner_join(&pred.column, &right),
            )?;
            tree.remove(&path, Direction::None)?;
        }
    }

    /// Leaves stay in FROM order. Cost-based reordering would plug in here.
    fn rearrange_leaf_nodes(&self, _tree: &mut QueryTree) {}

    /// Marks streamable subtrees along the path from the first relation to the root, then
    /// the whole tree.
    fn find_subtrees_to_pipeline(&self, tree: &mut QueryTree) -> Result<usize, DbError> {
        let first = tree
            .locations()
            .into_iter()
            .find(|(_, op)| op.kind() == OperatorKind::Relation)
            .map(|(path, _)| path);
        let mut marked = 0;
        if let Some(mut path) = first {
            while let Some(parent) = QueryTree::parent_path(&path) {
                path = parent;
                if tree.get(&path, Direction::None)?.is_binary() {
                    for side in &[Left, Right] {
                        if tree.try_pipeline(&path, *side)? {
                            marked += 1;
                        }
                    }
                }
            }
        }
        if tree.try_pipeline(&[], Direction::None)? {
            marked += 1;
        }
        debug!("Marked {} pipelined subtree(s)", marked);
        Ok(marked)
    }
}

fn selection_operator(predicates: Vec<Predicate>) -> Result<Option<Operator>, DbError> {
    match predicates.len() {
        0 => Ok(None),
        1 => Ok(predicates.into_iter().next().map(Operator::selection)),
        _ => Ok(Some(Operator::CompoundSelection(
            CompoundSelectionNode::new(predicates)?,
        ))),
    }
}

/// Path of the lowest node on the unary chain from the root.
fn bottom_path(tree: &QueryTree) -> TraversalPath {
    let mut path = Vec::new();
    while tree.get(&path, Down).is_ok() {
        path.push(Down);
    }
    path
}

/// Innermost binary node whose subtree holds both tables, found by walking up from the
/// shallower one.
fn join_location(tree: &QueryTree, a: &str, b: &str) -> Result<TraversalPath, DbError> {
    let path_a = tree.get_relation_location(a)?;
    let path_b = tree.get_relation_location(b)?;
    let (shallow, deep) = if path_b.len() < path_a.len() {
        (path_b, path_a)
    } else {
        (path_a, path_b)
    };
    let mut candidate = shallow;
    while let Some(parent) = QueryTree::parent_path(&candidate) {
        candidate = parent;
        if tree.get(&candidate, Direction::None)?.is_binary() && deep.starts_with(&candidate) {
            return Ok(candidate);
        }
    }
    Err(DbError::LocationNotFound(format!(
        "No product holds both {} and {}",
        a, b
    )))
}

/// Columns referenced by every node above `path`.
fn ancestor_columns(tree: &QueryTree, path: &[Direction]) -> Result<Vec<String>, DbError> {
    let mut columns = Vec::new();
    let mut ancestor = path.to_vec();
    while let Some(parent) = QueryTree::parent_path(&ancestor) {
        ancestor = parent;
        columns.extend(
            tree.get(&ancestor, Direction::None)?
                .referenced_columns()
                .into_iter()
                .map(String::from),
        );
    }
    Ok(columns)
}

/// Topmost node of the unary chain holding `path`, directly under a binary node.
fn branch_top(tree: &QueryTree, path: &[Direction]) -> Result<Option<TraversalPath>, DbError> {
    let mut child = path.to_vec();
    while let Some(parent) = QueryTree::parent_path(&child) {
        if tree.get(&parent, Direction::None)?.is_binary() {
            return Ok(Some(child));
        }
        child = parent;
    }
    Ok(None)
}

/// Whether following DOWN moves from `path` reaches a binary node.
fn leads_to_binary(tree: &QueryTree, path: &[Direction]) -> Result<bool, DbError> {
    let mut path = path.to_vec();
    loop {
        let op = tree.get(&path, Direction::None)?;
        if op.is_binary() {
            return Ok(true);
        }
        if op.arity() == 1 && tree.get(&path, Down).is_ok() {
            path.push(Down);
        } else {
            return Ok(false);
        }
    }
}
