use std::cmp::Ordering;

use itertools::Itertools;

use crate::dom::{local_part, Document, NodeId, NodeKind};

use super::ast::{Axis, Expr, NodeTest, Operand, Operator, Path, Step};

/// A node selected by a path. Attributes are not nodes of a [`Document`], so
/// they are addressed by their element and their index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl Item {
    /// Attributes come after their element and before its children
    fn order_key(&self) -> (NodeId, usize) {
        match *self {
            Item::Node(id) => (id, 0),
            Item::Attribute(id, i) => (id, i + 1),
        }
    }

    /// Returns the item's string value: the concatenated descendant text of
    /// an element, the content of a text node, or the value of an attribute
    pub fn string_value(&self, doc: &Document) -> String {
        match *self {
            Item::Node(id) => doc.string_value(id),
            Item::Attribute(id, i) => doc
                .attributes(id)
                .get(i)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
        }
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The result of evaluating an operand
enum Value {
    Items(Vec<Item>),
    String(String),
    Number(f64),
}

impl Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Items(items) => !items.is_empty(),
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
        }
    }

    fn strings(&self, doc: &Document) -> Vec<String> {
        match self {
            Value::Items(items) => items.iter().map(|i| i.string_value(doc)).collect(),
            Value::String(s) => vec![s.clone()],
            Value::Number(n) => vec![n.to_string()],
        }
    }

    fn numbers(&self, doc: &Document) -> Vec<f64> {
        match self {
            Value::Number(n) => vec![*n],
            _ => self
                .strings(doc)
                .iter()
                .map(|s| s.trim().parse().unwrap_or(f64::NAN))
                .collect(),
        }
    }
}

/// Evaluates `path` with `context` as the context item. Returns the selected
/// items in document order without duplicates.
pub fn evaluate(path: &Path, doc: &Document, context: Item) -> Vec<Item> {
    let mut current = if path.absolute {
        vec![Item::Node(doc.root())]
    } else {
        vec![context]
    };

    for step in &path.steps {
        current = current
            .iter()
            .flat_map(|&item| select(step, doc, item))
            .sorted()
            .dedup()
            .collect();
    }

    current
}

/// Applies a single step to a context item
fn select(step: &Step, doc: &Document, item: Item) -> Vec<Item> {
    let mut selected = axis(doc, item, step.axis)
        .into_iter()
        .filter(|&c| matches_test(doc, c, &step.test))
        .collect::<Vec<_>>();

    // positions count in axis order, sorting happens in `evaluate`
    for predicate in &step.predicates {
        selected = selected
            .into_iter()
            .enumerate()
            .filter(|&(i, c)| eval_predicate(predicate, doc, c, i + 1))
            .map(|(_, c)| c)
            .collect();
    }

    selected
}

/// Returns the items on the given axis. Reverse axes return the nearest item
/// first.
fn axis(doc: &Document, item: Item, axis: Axis) -> Vec<Item> {
    let id = match item {
        Item::Node(id) => id,
        Item::Attribute(owner, _) => {
            return match axis {
                Axis::SelfNode | Axis::DescendantOrSelf => vec![item],
                Axis::Parent => vec![Item::Node(owner)],
                Axis::Ancestor => nodes(std::iter::once(owner).chain(doc.ancestors(owner))),
                Axis::AncestorOrSelf => {
                    let mut r = vec![item];
                    r.extend(std::iter::once(owner).chain(doc.ancestors(owner)).map(Item::Node));
                    r
                }
                _ => vec![],
            };
        }
    };

    match axis {
        Axis::Child => nodes(doc.children(id).iter().copied()),
        Axis::Descendant => nodes(doc.descendants(id)),
        Axis::DescendantOrSelf => nodes(std::iter::once(id).chain(doc.descendants(id))),
        Axis::Parent => nodes(doc.parent(id)),
        Axis::Ancestor => nodes(doc.ancestors(id)),
        Axis::AncestorOrSelf => nodes(std::iter::once(id).chain(doc.ancestors(id))),
        Axis::FollowingSibling => siblings(doc, id)
            .iter()
            .skip_while(|&&s| s != id)
            .skip(1)
            .map(|&s| Item::Node(s))
            .collect(),
        Axis::PrecedingSibling => siblings(doc, id)
            .iter()
            .rev()
            .skip_while(|&&s| s != id)
            .skip(1)
            .map(|&s| Item::Node(s))
            .collect(),
        Axis::SelfNode => vec![item],
        Axis::Attribute => doc
            .attributes(id)
            .iter()
            .enumerate()
            .filter(|(_, a)| !is_namespace_declaration(&a.name))
            .map(|(i, _)| Item::Attribute(id, i))
            .collect(),
    }
}

fn nodes(ids: impl IntoIterator<Item = NodeId>) -> Vec<Item> {
    ids.into_iter().map(Item::Node).collect()
}

fn siblings(doc: &Document, id: NodeId) -> &[NodeId] {
    match doc.parent(id) {
        Some(p) => doc.children(p),
        None => &[],
    }
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Compares a name test with a qualified name. Tests without prefix only
/// compare the local part.
fn name_matches(test: &str, name: &str) -> bool {
    if test.contains(':') {
        test == name
    } else {
        test == local_part(name)
    }
}

fn matches_test(doc: &Document, item: Item, test: &NodeTest) -> bool {
    match item {
        Item::Attribute(owner, i) => match test {
            NodeTest::Name(n) => doc
                .attributes(owner)
                .get(i)
                .is_some_and(|a| name_matches(n, &a.name)),
            NodeTest::Any | NodeTest::Node => true,
            NodeTest::Text | NodeTest::Comment => false,
        },

        Item::Node(id) => match (test, doc.node(id).kind()) {
            (NodeTest::Node, _) => true,
            (NodeTest::Name(n), NodeKind::Element { name, .. }) => name_matches(n, name),
            (NodeTest::Any, NodeKind::Element { .. }) => true,
            (NodeTest::Text, NodeKind::Text(_)) => true,
            (NodeTest::Comment, NodeKind::Comment(_)) => true,
            _ => false,
        },
    }
}

fn eval_operand(operand: &Operand, doc: &Document, context: Item) -> Value {
    match operand {
        Operand::Path(p) => Value::Items(evaluate(p, doc, context)),
        Operand::Literal(s) => Value::String(s.clone()),
        Operand::Number(n) => Value::Number(*n),
    }
}

fn eval_predicate(expr: &Expr, doc: &Document, context: Item, position: usize) -> bool {
    match expr {
        Expr::Exists(Operand::Number(n)) => position as f64 == *n,

        Expr::Exists(o) => eval_operand(o, doc, context).is_truthy(),

        Expr::Compare {
            left,
            operator,
            right,
        } => {
            let l = eval_operand(left, doc, context);
            let r = eval_operand(right, doc, context);
            compare(&l, *operator, &r, doc)
        }
    }
}

/// Compares two values. Comparisons involving node sets are true if any
/// pair of items satisfies the operator.
fn compare(left: &Value, operator: Operator, right: &Value, doc: &Document) -> bool {
    let numeric = matches!(left, Value::Number(_)) || matches!(right, Value::Number(_));
    if numeric {
        let ls = left.numbers(doc);
        let rs = right.numbers(doc);
        ls.iter().cartesian_product(rs.iter()).any(|(a, b)| match operator {
            Operator::Eq => a == b,
            Operator::NotEq => a != b,
        })
    } else {
        let ls = left.strings(doc);
        let rs = right.strings(doc);
        ls.iter().cartesian_product(rs.iter()).any(|(a, b)| match operator {
            Operator::Eq => a == b,
            Operator::NotEq => a != b,
        })
    }
}
