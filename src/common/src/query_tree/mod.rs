//! Relational-algebra operator trees.
//!
//! Nodes live in an arena and are addressed from the outside by a traversal path (moves
//! from the root) plus a final move. Edits rewire parent links inside the arena, so no
//! caller ever holds a reference into the tree while it changes.
mod operator;

pub use operator::*;

use crate::DbError;
use std::fmt;

/// Moves used to address a node.
///
/// Paths only contain `Down`, `Left` and `Right`. `Up` and `None` are only valid as the
/// final move of a location.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Single child of a unary node.
    Down,
    Left,
    Right,
    /// Parent slot, for insertion above a node.
    Up,
    /// The node the path already reached.
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Up => "UP",
            Direction::None => "NONE",
        };
        write!(f, "{}", name)
    }
}

pub type TraversalPath = Vec<Direction>;

/// Binary operators allowed on one root-to-leaf chain of a pipelined subtree.
const MAX_PIPELINED_JOIN_DEPTH: usize = 2;

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    op: Operator,
    parent: Option<NodeId>,
    /// Child of a unary node, or LEFT child of a binary node.
    left: Option<NodeId>,
    right: Option<NodeId>,
    pipelined: bool,
}

impl Node {
    fn new(op: Operator, parent: Option<NodeId>) -> Self {
        Self {
            op,
            parent,
            left: None,
            right: None,
            pipelined: false,
        }
    }

    fn child(&self, dir: Direction) -> Option<NodeId> {
        match dir {
            Direction::Down | Direction::Left => self.left,
            Direction::Right => self.right,
            Direction::Up | Direction::None => None,
        }
    }

    fn children(&self) -> impl Iterator<Item = NodeId> {
        self.left.into_iter().chain(self.right)
    }
}

/// A rooted tree of operators.
#[derive(Debug, Clone)]
pub struct QueryTree {
    /// Arena of nodes. Removed nodes leave a `None` slot behind.
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl QueryTree {
    /// Creates a tree holding only `root`.
    pub fn new(root: Operator) -> Self {
        Self {
            nodes: vec![Some(Node::new(root, None))],
            root: 0,
        }
    }

    fn node(&self, id: NodeId) -> Result<&Node, DbError> {
        self.nodes
            .get(id)
            .and_then(|n| n.as_ref())
            .ok_or_else(|| DbError::LocationNotFound(format!("Dangling node {}", id)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DbError> {
        self.nodes
            .get_mut(id)
            .and_then(|n| n.as_mut())
            .ok_or_else(|| DbError::LocationNotFound(format!("Dangling node {}", id)))
    }

    fn alloc(&mut self, op: Operator, parent: Option<NodeId>) -> NodeId {
        self.nodes.push(Some(Node::new(op, parent)));
        self.nodes.len() - 1
    }

    /// Drops a node and its whole subtree from the arena.
    fn free(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id).and_then(|n| n.take()) {
            for child in node.children() {
                self.free(child);
            }
        }
    }

    /// Applies one move from `id`.
    fn step(&self, id: NodeId, dir: Direction) -> Result<NodeId, DbError> {
        let node = self.node(id)?;
        let arity = node.op.arity();
        match dir {
            Direction::None => return Ok(id),
            Direction::Up => {
                return node.parent.ok_or_else(|| {
                    DbError::LocationNotFound(format!("{} is the root", node.op.kind()))
                })
            }
            Direction::Down if arity != 1 => {}
            Direction::Left | Direction::Right if arity != 2 => {}
            _ => {
                return node.child(dir).ok_or_else(|| {
                    DbError::LocationNotFound(format!(
                        "{} has no {} child",
                        node.op.kind(),
                        dir
                    ))
                })
            }
        }
        Err(DbError::ArityViolation(format!(
            "Cannot move {} from {}",
            dir,
            node.op.kind()
        )))
    }

    fn resolve(&self, path: &[Direction]) -> Result<NodeId, DbError> {
        let mut id = self.root;
        for (i, dir) in path.iter().enumerate() {
            match dir {
                Direction::Up | Direction::None => {
                    return Err(DbError::LocationNotFound(format!(
                        "{} at step {} is not a path move",
                        dir, i
                    )))
                }
                _ => id = self.step(id, *dir)?,
            }
        }
        Ok(id)
    }

    fn locate(&self, path: &[Direction], last: Direction) -> Result<NodeId, DbError> {
        let id = self.resolve(path)?;
        self.step(id, last)
    }

    /// Points whatever referenced `old` (a parent slot, or the root) at `new`.
    fn relink(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) -> Result<(), DbError> {
        match parent {
            None => self.root = new,
            Some(p) => {
                let parent_node = self.node_mut(p)?;
                if parent_node.left == Some(old) {
                    parent_node.left = Some(new);
                } else if parent_node.right == Some(old) {
                    parent_node.right = Some(new);
                }
            }
        }
        self.node_mut(new)?.parent = parent;
        Ok(())
    }

    /// Reads the operator at a location.
    ///
    /// # Arguments
    ///
    /// * `path` - Moves from the root.
    /// * `last` - Final move. `Up` reads the parent.
    pub fn get(&self, path: &[Direction], last: Direction) -> Result<&Operator, DbError> {
        let id = self.locate(path, last)?;
        Ok(&self.node(id)?.op)
    }

    /// Operator at the root.
    pub fn root_operator(&self) -> Result<&Operator, DbError> {
        Ok(&self.node(self.root)?.op)
    }

    /// Replaces the operator at a location, keeping its children.
    ///
    /// Children beyond the arity of `op` are dropped.
    pub fn set(&mut self, path: &[Direction], last: Direction, op: Operator) -> Result<(), DbError> {
        let id = self.locate(path, last)?;
        let arity = op.arity();
        let (left, right) = {
            let node = self.node_mut(id)?;
            node.op = op;
            (node.left, node.right)
        };
        if arity < 2 {
            if let Some(right) = right {
                self.free(right);
                self.node_mut(id)?.right = None;
            }
        }
        if arity < 1 {
            if let Some(left) = left {
                self.free(left);
                self.node_mut(id)?.left = None;
            }
        }
        Ok(())
    }

    /// Inserts `op` into the tree.
    ///
    /// * `Up` - `op` becomes the parent of the node at `path`, which hangs below it as its
    ///   single (or LEFT) child.
    /// * `Down` - `op` goes between the unary node at `path` and its child.
    /// * `Left`/`Right` - `op` replaces that child of the binary node at `path`.
    ///
    /// `None` is not a valid final move for an insertion.
    pub fn add(&mut self, path: &[Direction], last: Direction, op: Operator) -> Result<(), DbError> {
        match last {
            Direction::Up => {
                if op.arity() == 0 {
                    return Err(DbError::ArityViolation(format!(
                        "{} cannot take a child",
                        op.kind()
                    )));
                }
                let target = self.resolve(path)?;
                let parent = self.node(target)?.parent;
                let new = self.alloc(op, parent);
                self.node_mut(new)?.left = Some(target);
                self.relink(parent, target, new)?;
                self.node_mut(target)?.parent = Some(new);
            }
            Direction::Down => {
                let target = self.resolve(path)?;
                let (kind, arity, child) = {
                    let node = self.node(target)?;
                    (node.op.kind(), node.op.arity(), node.left)
                };
                if arity != 1 {
                    return Err(DbError::ArityViolation(format!(
                        "Cannot insert below {}",
                        kind
                    )));
                }
                if child.is_some() && op.arity() == 0 {
                    return Err(DbError::ArityViolation(format!(
                        "{} cannot take a child",
                        op.kind()
                    )));
                }
                let new = self.alloc(op, Some(target));
                self.node_mut(new)?.left = child;
                if let Some(child) = child {
                    self.node_mut(child)?.parent = Some(new);
                }
                self.node_mut(target)?.left = Some(new);
            }
            Direction::Left | Direction::Right => {
                let target = self.resolve(path)?;
                let (kind, arity, old) = {
                    let node = self.node(target)?;
                    (node.op.kind(), node.op.arity(), node.child(last))
                };
                if arity != 2 {
                    return Err(DbError::ArityViolation(format!(
                        "{} has no {} child",
                        kind, last
                    )));
                }
                if let Some(old) = old {
                    self.free(old);
                }
                let new = self.alloc(op, Some(target));
                let node = self.node_mut(target)?;
                if last == Direction::Left {
                    node.left = Some(new);
                } else {
                    node.right = Some(new);
                }
            }
            Direction::None => {
                return Err(DbError::ArityViolation(String::from(
                    "Insertion needs a final move other than NONE",
                )))
            }
        }
        Ok(())
    }

    /// Deletes the unary node at a location, splicing its child into its place.
    ///
    /// Binary nodes and leaves cannot be removed.
    pub fn remove(&mut self, path: &[Direction], last: Direction) -> Result<(), DbError> {
        let id = self.locate(path, last)?;
        let (kind, arity, parent, child) = {
            let node = self.node(id)?;
            (node.op.kind(), node.op.arity(), node.parent, node.left)
        };
        if arity != 1 {
            return Err(DbError::ArityViolation(format!("Cannot remove {}", kind)));
        }
        match (child, parent) {
            (Some(child), _) => self.relink(parent, id, child)?,
            (None, Some(p)) => {
                let parent_node = self.node_mut(p)?;
                if parent_node.left == Some(id) {
                    parent_node.left = None;
                } else if parent_node.right == Some(id) {
                    parent_node.right = None;
                }
            }
            (None, None) => {
                return Err(DbError::ArityViolation(format!(
                    "Cannot remove {}, it is the only node",
                    kind
                )))
            }
        }
        if let Some(slot) = self.nodes.get_mut(id) {
            *slot = None;
        }
        Ok(())
    }

    /// Path of the single Relation node for `table_name` (matched ignoring case).
    pub fn get_relation_location(&self, table_name: &str) -> Result<TraversalPath, DbError> {
        let mut matches: Vec<TraversalPath> = self
            .locations()
            .into_iter()
            .filter(|(_, op)| {
                op.table_name()
                    .map_or(false, |t| t.eq_ignore_ascii_case(table_name))
            })
            .map(|(path, _)| path)
            .collect();
        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(DbError::RelationNotFound(table_name.to_string())),
            n => Err(DbError::RelationNotFound(format!(
                "{} appears {} times",
                table_name, n
            ))),
        }
    }

    /// Number of nodes of the given kind.
    pub fn get_type_occurrence(&self, kind: OperatorKind) -> usize {
        self.iter().filter(|op| op.kind() == kind).count()
    }

    /// Pre-order iterator over the operators: root, LEFT/DOWN subtree, RIGHT subtree.
    pub fn iter(&self) -> Operators<'_> {
        Operators {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.iter().count()
    }

    /// Structural copy with a compacted arena. Pipelining marks are copied too.
    pub fn deep_copy(&self) -> QueryTree {
        let mut copy = QueryTree {
            nodes: Vec::with_capacity(self.size()),
            root: 0,
        };
        if let Some(root) = self.copy_into(&mut copy, self.root, None) {
            copy.root = root;
        }
        copy
    }

    fn copy_into(&self, copy: &mut QueryTree, id: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let node = self.node(id).ok()?;
        let new = copy.alloc(node.op.clone(), parent);
        let left = node.left.and_then(|l| self.copy_into(copy, l, Some(new)));
        let right = node.right.and_then(|r| self.copy_into(copy, r, Some(new)));
        if let Some(Some(copied)) = copy.nodes.get_mut(new) {
            copied.left = left;
            copied.right = right;
            copied.pipelined = node.pipelined;
        }
        Some(new)
    }

    /// Every node's path together with its operator, in pre-order.
    pub fn locations(&self) -> Vec<(TraversalPath, &Operator)> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, Vec::new())];
        while let Some((id, path)) = stack.pop() {
            let node = match self.node(id) {
                Ok(node) => node,
                Err(_) => continue,
            };
            if node.op.is_binary() {
                for (child, dir) in [(node.right, Direction::Right), (node.left, Direction::Left)].iter() {
                    if let Some(child) = child {
                        let mut child_path = path.clone();
                        child_path.push(*dir);
                        stack.push((*child, child_path));
                    }
                }
            } else if let Some(child) = node.left {
                let mut child_path = path.clone();
                child_path.push(Direction::Down);
                stack.push((child, child_path));
            }
            out.push((path, &node.op));
        }
        out
    }

    /// Path of the parent of the node at `path`, or `None` for the root.
    pub fn parent_path(path: &[Direction]) -> Option<TraversalPath> {
        path.split_last().map(|(_, rest)| rest.to_vec())
    }

    fn side_target(&self, path: &[Direction], side: Direction) -> Result<NodeId, DbError> {
        match side {
            Direction::Left | Direction::Right | Direction::None => self.locate(path, side),
            _ => Err(DbError::ArityViolation(format!(
                "Cannot pipeline towards {}",
                side
            ))),
        }
    }

    /// A subtree streams if it has no Aggregation or AggregateSelection and at most
    /// two binary operators on any root-to-leaf chain.
    fn pipelinable(&self, id: NodeId) -> Result<bool, DbError> {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = self.node(next)?;
            match node.op.kind() {
                OperatorKind::Aggregation | OperatorKind::AggregateSelection => return Ok(false),
                _ => stack.extend(node.children()),
            }
        }
        Ok(self.join_depth(id)? <= MAX_PIPELINED_JOIN_DEPTH)
    }

    fn join_depth(&self, id: NodeId) -> Result<usize, DbError> {
        let node = self.node(id)?;
        let mut depth = 0;
        for child in node.children() {
            depth = depth.max(self.join_depth(child)?);
        }
        Ok(if node.op.is_binary() { depth + 1 } else { depth })
    }

    /// Checks whether the subtree at `path` + `side` could be pipelined.
    ///
    /// # Arguments
    ///
    /// * `path` - Moves from the root.
    /// * `side` - `Left` or `Right` child of a binary node, or `None` for the node itself.
    pub fn can_pipeline(&self, path: &[Direction], side: Direction) -> Result<bool, DbError> {
        let id = self.side_target(path, side)?;
        self.pipelinable(id)
    }

    /// Marks the subtree at `path` + `side` as pipelined if it is eligible.
    ///
    /// Returns true only if the subtree was not marked before.
    pub fn try_pipeline(&mut self, path: &[Direction], side: Direction) -> Result<bool, DbError> {
        let id = self.side_target(path, side)?;
        if self.node(id)?.pipelined || !self.pipelinable(id)? {
            return Ok(false);
        }
        self.node_mut(id)?.pipelined = true;
        Ok(true)
    }

    /// Whether the subtree at `path` + `side` is marked as pipelined.
    pub fn is_pipelined(&self, path: &[Direction], side: Direction) -> Result<bool, DbError> {
        let id = self.side_target(path, side)?;
        Ok(self.node(id)?.pipelined)
    }

    /// Number of subtrees marked as pipelined.
    pub fn pipelined_count(&self) -> usize {
        self.node_ids()
            .into_iter()
            .filter(|id| self.node(*id).map_or(false, |n| n.pipelined))
            .count()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Ok(node) = self.node(id) {
                ids.push(id);
                stack.extend(node.right);
                stack.extend(node.left);
            }
        }
        ids
    }

    /// Indented rendering, one operator per line.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            if let Ok(node) = self.node(id) {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&node.op.to_string());
                if node.pipelined {
                    out.push_str(" [pipelined]");
                }
                out.push('\n');
                if let Some(right) = node.right {
                    stack.push((right, depth + 1));
                }
                if let Some(left) = node.left {
                    stack.push((left, depth + 1));
                }
            }
        }
        out
    }

    /// JSON rendering: `{"operator": .., "pipelined": .., "children": [..]}` per node.
    pub fn to_json(&self) -> serde_json::Value {
        self.node_json(self.root)
    }

    fn node_json(&self, id: NodeId) -> serde_json::Value {
        match self.node(id) {
            Ok(node) => {
                let children: Vec<serde_json::Value> =
                    node.children().map(|c| self.node_json(c)).collect();
                serde_json::json!({
                    "operator": node.op,
                    "pipelined": node.pipelined,
                    "children": children,
                })
            }
            Err(_) => serde_json::Value::Null,
        }
    }

    fn subtree_eq(&self, a: Option<NodeId>, other: &QueryTree, b: Option<NodeId>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => match (self.node(a), other.node(b)) {
                (Ok(x), Ok(y)) => {
                    x.op == y.op
                        && self.subtree_eq(x.left, other, y.left)
                        && self.subtree_eq(x.right, other, y.right)
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn fmt_node(&self, id: Option<NodeId>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = match id.map(|id| self.node(id)) {
            Some(Ok(node)) => node,
            _ => return write!(f, "?"),
        };
        match &node.op {
            Operator::Relation(rel) => write!(f, "{}", rel.table_name),
            op if op.is_binary() => {
                write!(f, "(")?;
                self.fmt_node(node.left, f)?;
                write!(f, " {} ", op)?;
                self.fmt_node(node.right, f)?;
                write!(f, ")")
            }
            op => {
                write!(f, "{}(", op)?;
                self.fmt_node(node.left, f)?;
                write!(f, ")")
            }
        }
    }
}

/// Structural equality: same operators in the same shape. Marks and arena layout are ignored.
impl PartialEq for QueryTree {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(Some(self.root), other, Some(other.root))
    }
}

/// Relational-algebra expression, e.g. `PROJECT[A.x](SELECT[A.y = 1](A))`.
impl fmt::Display for QueryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(Some(self.root), f)
    }
}

/// Pre-order operator iterator.
pub struct Operators<'a> {
    tree: &'a QueryTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Operators<'a> {
    type Item = &'a Operator;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Ok(node) = self.tree.node(id) {
                self.stack.extend(node.right);
                self.stack.extend(node.left);
                return Some(&node.op);
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a QueryTree {
    type Item = &'a Operator;
    type IntoIter = Operators<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod test {
    use super::Direction::*;
    use super::*;
    use crate::testutil::init;

    fn rel(name: &str) -> Operator {
        Operator::relation(name)
    }

    fn proj(columns: &[&str]) -> Operator {
        Operator::projection(columns.iter().map(|c| c.to_string()).collect())
    }

    fn sel(column: &str, value: &str) -> Operator {
        Operator::selection(Predicate::literal(column, Comparator::Equals, value))
    }

    /// PROJECT[A.x]((A CROSS B))
    fn two_table_tree() -> QueryTree {
        let mut tree = QueryTree::new(proj(&["A.x"]));
        tree.add(&[], Down, Operator::CartesianProduct).unwrap();
        tree.add(&[Down], Left, rel("A")).unwrap();
        tree.add(&[Down], Right, rel("B")).unwrap();
        tree
    }

    /// Left-deep product over `names`, under a projection.
    fn chain_tree(names: &[&str]) -> QueryTree {
        let mut tree = QueryTree::new(proj(&["T0.id"]));
        tree.add(&[], Down, rel(names[0])).unwrap();
        for name in &names[1..] {
            tree.add(&[Down], Up, Operator::CartesianProduct).unwrap();
            tree.add(&[Down], Right, rel(name)).unwrap();
        }
        tree
    }

    #[test]
    fn test_get() {
        init();
        let tree = two_table_tree();
        assert_eq!(&proj(&["A.x"]), tree.get(&[], None).unwrap());
        assert_eq!(&Operator::CartesianProduct, tree.get(&[], Down).unwrap());
        assert_eq!(&rel("B"), tree.get(&[Down], Right).unwrap());
        assert_eq!(&Operator::CartesianProduct, tree.get(&[Down, Left], Up).unwrap());
    }

    #[test]
    fn test_get_errors() {
        init();
        let tree = two_table_tree();
        assert!(matches!(
            tree.get(&[], Left),
            Err(DbError::ArityViolation(_))
        ));
        assert!(matches!(
            tree.get(&[Down], Down),
            Err(DbError::ArityViolation(_))
        ));
        assert!(matches!(
            tree.get(&[Down, Left], Down),
            Err(DbError::ArityViolation(_))
        ));
        assert!(matches!(
            tree.get(&[], Up),
            Err(DbError::LocationNotFound(_))
        ));
        assert!(matches!(
            tree.get(&[Up], None),
            Err(DbError::LocationNotFound(_))
        ));
        let lone = QueryTree::new(proj(&["A.x"]));
        assert!(matches!(
            lone.get(&[], Down),
            Err(DbError::LocationNotFound(_))
        ));
    }

    #[test]
    fn test_add_up_at_root_and_inner() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[], Up, sel("A.x", "1")).unwrap();
        assert_eq!(&sel("A.x", "1"), tree.root_operator().unwrap());
        assert_eq!(&proj(&["A.x"]), tree.get(&[], Down).unwrap());

        tree.add(&[Down, Down, Right], Up, sel("B.y", "2")).unwrap();
        assert_eq!(&sel("B.y", "2"), tree.get(&[Down, Down], Right).unwrap());
        assert_eq!(&rel("B"), tree.get(&[Down, Down, Right], Down).unwrap());
        assert_eq!(6, tree.size());
    }

    #[test]
    fn test_add_up_binary_takes_left_slot() {
        init();
        let mut tree = QueryTree::new(proj(&["A.x"]));
        tree.add(&[], Down, rel("A")).unwrap();
        tree.add(&[Down], Up, Operator::CartesianProduct).unwrap();
        assert_eq!(&rel("A"), tree.get(&[Down], Left).unwrap());
        assert!(matches!(
            tree.get(&[Down], Right),
            Err(DbError::LocationNotFound(_))
        ));
        assert!(matches!(
            tree.add(&[Down], Up, rel("C")),
            Err(DbError::ArityViolation(_))
        ));
    }

    #[test]
    fn test_add_down() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[], Down, sel("A.x", "1")).unwrap();
        assert_eq!(&sel("A.x", "1"), tree.get(&[], Down).unwrap());
        assert_eq!(&Operator::CartesianProduct, tree.get(&[Down], Down).unwrap());
        assert!(matches!(
            tree.add(&[Down, Down], Down, sel("A.x", "2")),
            Err(DbError::ArityViolation(_))
        ));

        let mut lone = QueryTree::new(proj(&["A.x"]));
        lone.add(&[], Down, rel("A")).unwrap();
        assert_eq!(&rel("A"), lone.get(&[], Down).unwrap());
    }

    #[test]
    fn test_add_child_replaces() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[Down], Right, rel("C")).unwrap();
        assert_eq!(&rel("C"), tree.get(&[Down], Right).unwrap());
        assert_eq!(4, tree.size());
        assert!(matches!(
            tree.add(&[], Left, rel("C")),
            Err(DbError::ArityViolation(_))
        ));
        assert!(matches!(
            tree.add(&[], None, rel("C")),
            Err(DbError::ArityViolation(_))
        ));
    }

    #[test]
    fn test_set() {
        init();
        let mut tree = two_table_tree();
        tree.set(&[], Down, Operator::inner_join("A.x", "B.x")).unwrap();
        assert_eq!(4, tree.size());
        assert_eq!(&rel("A"), tree.get(&[Down], Left).unwrap());

        tree.set(&[], Down, sel("A.x", "1")).unwrap();
        assert_eq!(3, tree.size());
        assert_eq!(&rel("A"), tree.get(&[Down], Down).unwrap());

        tree.set(&[Down], None, rel("Z")).unwrap();
        assert_eq!(2, tree.size());
    }

    #[test]
    fn test_remove_splices_child() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[Down], Left, rel("A")).unwrap();
        tree.add(&[Down, Left], Up, sel("A.x", "1")).unwrap();
        tree.remove(&[Down], Left).unwrap();
        assert_eq!(two_table_tree(), tree);

        tree.remove(&[], None).unwrap();
        assert_eq!(&Operator::CartesianProduct, tree.root_operator().unwrap());
    }

    #[test]
    fn test_remove_errors() {
        init();
        let mut tree = two_table_tree();
        assert!(matches!(
            tree.remove(&[], Down),
            Err(DbError::ArityViolation(_))
        ));
        assert!(matches!(
            tree.remove(&[Down], Left),
            Err(DbError::ArityViolation(_))
        ));
        let mut lone = QueryTree::new(proj(&["A.x"]));
        assert!(matches!(
            lone.remove(&[], None),
            Err(DbError::ArityViolation(_))
        ));
    }

    #[test]
    fn test_round_trip_edit() {
        init();
        let original = chain_tree(&["T0", "T1", "T2"]);
        for (path, _) in original.locations() {
            let mut tree = original.deep_copy();
            tree.add(&path, Up, sel("T0.id", "7")).unwrap();
            assert_ne!(original, tree);
            tree.remove(&path, None).unwrap();
            assert_eq!(original, tree, "round trip at {:?}", path);
        }
    }

    #[test]
    fn test_relation_location() {
        init();
        let tree = chain_tree(&["T0", "T1", "T2"]);
        assert_eq!(vec![Down, Left, Left], tree.get_relation_location("t0").unwrap());
        assert_eq!(vec![Down, Left, Right], tree.get_relation_location("T1").unwrap());
        assert_eq!(vec![Down, Right], tree.get_relation_location("T2").unwrap());
        assert!(matches!(
            tree.get_relation_location("T9"),
            Err(DbError::RelationNotFound(_))
        ));

        let mut dup = two_table_tree();
        dup.add(&[Down], Right, rel("A")).unwrap();
        assert!(matches!(
            dup.get_relation_location("A"),
            Err(DbError::RelationNotFound(_))
        ));
    }

    #[test]
    fn test_iteration_and_counts() {
        init();
        let tree = chain_tree(&["T0", "T1", "T2"]);
        let order: Vec<String> = tree.iter().map(|op| op.to_string()).collect();
        assert_eq!(
            vec!["PROJECT[T0.id]", "CROSS", "CROSS", "T0", "T1", "T2"],
            order
        );
        assert_eq!(tree.iter().count(), (&tree).into_iter().count());
        assert_eq!(2, tree.get_type_occurrence(OperatorKind::CartesianProduct));
        assert_eq!(3, tree.get_type_occurrence(OperatorKind::Relation));
        assert_eq!(0, tree.get_type_occurrence(OperatorKind::InnerJoin));
        assert_eq!(6, tree.size());
    }

    #[test]
    fn test_deep_copy_is_independent() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[], Down, sel("A.x", "1")).unwrap();
        tree.remove(&[], Down).unwrap();
        let copy = tree.deep_copy();
        assert_eq!(tree, copy);
        assert_eq!(copy.size(), copy.nodes.len());
        tree.set(&[Down], Left, rel("C")).unwrap();
        assert_ne!(tree, copy);
        assert_eq!(&rel("A"), copy.get(&[Down], Left).unwrap());
    }

    #[test]
    fn test_pipelining() {
        init();
        let mut tree = chain_tree(&["T0", "T1", "T2"]);
        assert!(tree.can_pipeline(&[Down], Left).unwrap());
        assert!(tree.try_pipeline(&[Down], Left).unwrap());
        assert!(!tree.try_pipeline(&[Down], Left).unwrap());
        assert!(tree.is_pipelined(&[Down], Left).unwrap());
        assert!(!tree.is_pipelined(&[Down], Right).unwrap());
        assert!(tree.try_pipeline(&[], None).unwrap());
        assert_eq!(2, tree.pipelined_count());
        assert!(matches!(
            tree.try_pipeline(&[], Up),
            Err(DbError::ArityViolation(_))
        ));

        // Marks are not part of structural equality.
        assert_eq!(chain_tree(&["T0", "T1", "T2"]), tree);
    }

    #[test]
    fn test_pipelining_limits() {
        init();
        let deep = chain_tree(&["T0", "T1", "T2", "T3"]);
        assert!(!deep.can_pipeline(&[], None).unwrap());
        assert!(deep.can_pipeline(&[Down], Left).unwrap());

        let mut grouped = two_table_tree();
        grouped
            .set(
                &[],
                None,
                Operator::Aggregation(AggregationNode {
                    group_by: vec![String::from("A.x")],
                    aggregates: vec![AggregateColumn::new(AggOp::Count, "*")],
                }),
            )
            .unwrap();
        assert!(!grouped.can_pipeline(&[], None).unwrap());
        assert!(grouped.can_pipeline(&[Down], Right).unwrap());
    }

    #[test]
    fn test_renderings() {
        init();
        let mut tree = two_table_tree();
        tree.add(&[Down], Left, rel("A")).unwrap();
        tree.add(&[Down, Left], Up, sel("A.y", "1")).unwrap();
        assert_eq!(
            "PROJECT[A.x]((SELECT[A.y = 1](A) CROSS B))",
            tree.to_string()
        );
        tree.try_pipeline(&[Down], Right).unwrap();
        assert_eq!(
            "PROJECT[A.x]\n  CROSS\n    SELECT[A.y = 1]\n      A\n    B [pipelined]\n",
            tree.explain()
        );
        let json = tree.to_json();
        assert_eq!(2, json["children"][0]["children"].as_array().unwrap().len());
        assert_eq!(
            serde_json::Value::Bool(true),
            json["children"][0]["children"][1]["pipelined"]
        );
    }

    #[test]
    fn test_parent_path() {
        assert!(QueryTree::parent_path(&[]).is_none());
        assert_eq!(Some(vec![Down]), QueryTree::parent_path(&[Down, Left]));
    }
}
