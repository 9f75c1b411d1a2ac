//! Expression nodes and the analysis-context seam.
//!
//! The offset builder walks a small numeric expression tree, [`ExprNode`].
//! The enclosing dataflow framework supplies the two oracles the walk
//! needs through [`BoundsContext`]: a resolver that names the nodes it can
//! represent symbolically, and a constant-value oracle for nodes whose
//! range is known at analysis time. [`SimpleContext`] is a map-backed
//! implementation used by the demos and tests.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// A numeric expression handed to the offset builder.
///
/// Only addition and subtraction are decomposed; everything else is either
/// named by the resolver or treated as unrepresentable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExprNode {
    /// An integer literal.
    Literal(i64),
    /// A named local, parameter, or field. The name is the canonical
    /// string the framework's expression parser would produce.
    Local(String),
    /// The length of a named sequence.
    LengthOf(String),
    /// A numeric addition.
    Add(Box<ExprNode>, Box<ExprNode>),
    /// A numeric subtraction.
    Sub(Box<ExprNode>, Box<ExprNode>),
    /// Any other expression, carrying its textual form.
    Opaque(String),
}

impl ExprNode {
    pub fn literal(value: i64) -> Self {
        ExprNode::Literal(value)
    }

    pub fn local(name: impl Into<String>) -> Self {
        ExprNode::Local(name.into())
    }

    pub fn length_of(sequence: impl Into<String>) -> Self {
        ExprNode::LengthOf(sequence.into())
    }

    pub fn add(left: Self, right: Self) -> Self {
        ExprNode::Add(Box::new(left), Box::new(right))
    }

    pub fn sub(left: Self, right: Self) -> Self {
        ExprNode::Sub(Box::new(left), Box::new(right))
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        ExprNode::Opaque(text.into())
    }
}

impl Display for ExprNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Literal(value) => write!(f, "{}", value),
            ExprNode::Local(name) => write!(f, "{}", name),
            ExprNode::LengthOf(sequence) => write!(f, "{}.length", sequence),
            ExprNode::Add(left, right) => write!(f, "{} + {}", left, right),
            ExprNode::Sub(left, right) => write!(f, "{} - {}", left, right),
            ExprNode::Opaque(text) => write!(f, "{}", text),
        }
    }
}

/// The seam between the offset algebra and the enclosing framework.
///
/// `resolve` is the symbolic-receiver resolver: the canonical name for a
/// node, stable under structural equality, or `None` for a node the
/// framework cannot represent (which makes the offset builder recurse or
/// give up). `min_value`/`max_value` are the constant-value oracle.
///
/// Names returned by `resolve` are the identity mechanism of the whole
/// lattice: the core compares them only by string equality, so the
/// implementation must render two occurrences of one logical expression
/// identically.
pub trait BoundsContext {
    fn resolve(&self, node: &ExprNode) -> Option<String>;

    fn min_value(&self, node: &ExprNode) -> Option<i64>;

    fn max_value(&self, node: &ExprNode) -> Option<i64>;
}

/// A map-backed [`BoundsContext`] for demos and tests.
///
/// Literals resolve to their decimal rendering, locals and length
/// accesses to their canonical names; additions, subtractions, and opaque
/// nodes do not resolve. Value ranges are registered per local name.
#[derive(Debug, Default)]
pub struct SimpleContext {
    ranges: HashMap<String, (i64, i64)>,
}

impl SimpleContext {
    pub fn new() -> Self {
        SimpleContext::default()
    }

    /// Registers the compile-time range of a local.
    pub fn set_range(&mut self, name: impl Into<String>, min: i64, max: i64) {
        assert!(min <= max, "Range must be non-empty");
        self.ranges.insert(name.into(), (min, max));
    }
}

impl BoundsContext for SimpleContext {
    fn resolve(&self, node: &ExprNode) -> Option<String> {
        match node {
            ExprNode::Literal(value) => Some(value.to_string()),
            ExprNode::Local(name) => Some(name.clone()),
            ExprNode::LengthOf(sequence) => Some(format!("{}.length", sequence)),
            ExprNode::Add(..) | ExprNode::Sub(..) | ExprNode::Opaque(_) => None,
        }
    }

    fn min_value(&self, node: &ExprNode) -> Option<i64> {
        match node {
            ExprNode::Literal(value) => Some(*value),
            ExprNode::Local(name) => self.ranges.get(name).map(|&(min, _)| min),
            _ => None,
        }
    }

    fn max_value(&self, node: &ExprNode) -> Option<i64> {
        match node {
            ExprNode::Literal(value) => Some(*value),
            ExprNode::Local(name) => self.ranges.get(name).map(|&(_, max)| max),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let node = ExprNode::add(
            ExprNode::local("i"),
            ExprNode::sub(ExprNode::length_of("a"), ExprNode::literal(1)),
        );
        assert_eq!(node.to_string(), "i + a.length - 1");
    }

    #[test]
    fn test_simple_context_resolve() {
        let ctx = SimpleContext::new();
        assert_eq!(ctx.resolve(&ExprNode::literal(7)), Some("7".to_string()));
        assert_eq!(ctx.resolve(&ExprNode::local("i")), Some("i".to_string()));
        assert_eq!(
            ctx.resolve(&ExprNode::length_of("buf")),
            Some("buf.length".to_string())
        );
        assert_eq!(ctx.resolve(&ExprNode::opaque("f(x)")), None);
        assert_eq!(
            ctx.resolve(&ExprNode::add(ExprNode::local("i"), ExprNode::literal(1))),
            None
        );
    }

    #[test]
    fn test_simple_context_ranges() {
        let mut ctx = SimpleContext::new();
        ctx.set_range("n", -2, 9);
        let n = ExprNode::local("n");
        assert_eq!(ctx.min_value(&n), Some(-2));
        assert_eq!(ctx.max_value(&n), Some(9));
        assert_eq!(ctx.min_value(&ExprNode::local("m")), None);
        assert_eq!(ctx.min_value(&ExprNode::literal(5)), Some(5));
    }
}
