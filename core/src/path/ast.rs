use std::fmt::{Display, Formatter};

/// Specifies the direction in which a [`Step`] navigates from its context
/// node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfNode,
    Attribute,
}

impl Axis {
    /// Looks up an axis by the name used in expressions (e.g.
    /// `descendant-or-self`)
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfNode,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }

    /// Returns `true` if the axis yields nodes in reverse document order
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::PrecedingSibling
        )
    }
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::Child => "child",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Parent => "parent",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::SelfNode => "self",
            Axis::Attribute => "attribute",
        };
        write!(f, "{name}")
    }
}

/// Selects nodes on an axis
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeTest {
    /// Nodes of the axis' principal type with the given name. Names without
    /// prefix are compared to local names, prefixed names to qualified names.
    Name(String),

    /// All nodes of the axis' principal type (`*`)
    Any,

    /// Text nodes (`text()`)
    Text,

    /// Comment nodes (`comment()`)
    Comment,

    /// All nodes (`node()`)
    Node,
}

/// Specifies how two operands should be compared to each other
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    /// The values must equal
    Eq,

    /// The values must not equal
    NotEq,
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::NotEq => write!(f, "!="),
        }
    }
}

/// A value in a predicate
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Path(Path),
    Literal(String),
    Number(f64),
}

/// A predicate of a [`Step`] (the part between `[` and `]`)
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// True if the operand selects a node, is a non-empty string, or (for a
    /// number) equals the context position
    Exists(Operand),

    Compare {
        left: Operand,
        operator: Operator,
        right: Operand,
    },
}

/// A single location step
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest, predicates: Vec<Expr>) -> Self {
        Self {
            axis,
            test,
            predicates,
        }
    }

    /// The step `//` stands for
    pub fn descendant_or_self() -> Self {
        Self::new(Axis::DescendantOrSelf, NodeTest::Node, vec![])
    }
}

/// A location path
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    /// `true` if evaluation starts at the document node instead of the
    /// context node
    pub absolute: bool,
    pub steps: Vec<Step>,
}

impl Path {
    pub fn absolute(steps: Vec<Step>) -> Self {
        Self {
            absolute: true,
            steps,
        }
    }

    /// An absolute path that starts with `//`
    pub fn absolute_descendants(steps: Vec<Step>) -> Self {
        let mut all = vec![Step::descendant_or_self()];
        all.extend(steps);
        Self::absolute(all)
    }

    pub fn relative(steps: Vec<Step>) -> Self {
        Self {
            absolute: false,
            steps,
        }
    }
}
