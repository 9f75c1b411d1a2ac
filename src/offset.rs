//! Symbolic offset equations.
//!
//! An [`OffsetEquation`] is a normalized linear expression: a set of added
//! term names, a set of subtracted term names, and a single integer
//! constant. Term names are canonicalized expression strings supplied by
//! the enclosing analysis framework (for example `"i"`, `"end"`, or
//! `"buf.length"`); the equation itself never inspects them beyond string
//! equality.
//!
//! Equations are immutable values. Every operation that "modifies" an
//! equation returns a fresh one, which keeps the qualifier layer free to
//! share equations between maps without defensive copies.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::node::{BoundsContext, ExprNode};

/// Marker prefix identifying an expression that already failed to parse in
/// the dependent-types front end. Such strings are carried through as an
/// [`OffsetEquation::error`] rather than re-parsed.
pub const EXPRESSION_ERROR_MARKER: &str = "[error";

/// Returns true if `expression` denotes a previously-failed parse.
pub fn is_expression_error(expression: &str) -> bool {
    expression.starts_with(EXPRESSION_ERROR_MARKER)
}

/// The sign with which a term or equation is combined.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    /// The opposite sign.
    pub fn flip(self) -> Sign {
        match self {
            Sign::Plus => Sign::Minus,
            Sign::Minus => Sign::Plus,
        }
    }

    fn apply(self, value: i64) -> i64 {
        match self {
            Sign::Plus => value,
            Sign::Minus => -value,
        }
    }
}

impl Display for Sign {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Sign::Plus => write!(f, "+"),
            Sign::Minus => write!(f, "-"),
        }
    }
}

/// A parsed offset term: either a canonical name valid at the use site, or
/// an integer constant the term is known to evaluate to.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Term {
    Name(String),
    Constant(i64),
}

/// Viewpoint adaptation seam.
///
/// Implemented by the framework's flow-expression parser: given a raw term
/// from a declaration-site annotation, produce the canonical form of that
/// term at a specific use site, or evaluate it to a compile-time constant.
/// An `Err` carries the parse failure message and poisons the equation.
pub trait FlowExprParser {
    fn parse(&self, term: &str) -> Result<Term, String>;
}

/// A normalized symbolic linear offset.
///
/// # Invariants
///
/// - A term name never appears in both `added_terms` and
///   `subtracted_terms`; insertion cancels against the opposite set first.
/// - A term that parses as an integer literal is folded into `int_value`,
///   never stored as a string term.
/// - Once `error` is set the equation is poisoned: the qualifier layer
///   refuses to build on it.
///
/// Equality is structural: equal term sets, equal constant, equal error.
/// The canonical [`Display`] form is for reporting and annotation output,
/// not for equality.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OffsetEquation {
    added_terms: BTreeSet<String>,
    subtracted_terms: BTreeSet<String>,
    int_value: i64,
    error: Option<String>,
}

impl OffsetEquation {
    /// The offset `0`.
    pub const ZERO: OffsetEquation = OffsetEquation::from_int(0);
    /// The offset `-1`.
    pub const NEG_1: OffsetEquation = OffsetEquation::from_int(-1);
    /// The offset `1`.
    pub const ONE: OffsetEquation = OffsetEquation::from_int(1);

    /// Creates an equation that is only the given integer constant.
    pub const fn from_int(value: i64) -> Self {
        OffsetEquation {
            added_terms: BTreeSet::new(),
            subtracted_terms: BTreeSet::new(),
            int_value: value,
            error: None,
        }
    }

    /// Creates an equation from an expression string made up of terms
    /// added to and subtracted from each other, e.g. `"x + 3 - y"`. The
    /// expression may start with `+` or `-`; the empty string is the zero
    /// equation.
    ///
    /// The splitter treats every `+`/`-` character as a delimiter. It does
    /// not respect parentheses or call-argument lists, so an expression
    /// such as `"f(a - b)"` mis-splits; callers are expected to pass
    /// pre-normalized expressions from the framework's expression parser.
    /// A mis-split term fails to resolve downstream and the resulting
    /// qualifier degrades to Unknown, which is sound.
    pub fn from_expression(expression: &str) -> Self {
        let expression = expression.trim();
        let mut eq = OffsetEquation::from_int(0);
        if expression.is_empty() {
            return eq;
        }
        if is_expression_error(expression) {
            eq.error = Some(expression.to_string());
            return eq;
        }
        if find_delimiter(expression, 0).is_none() {
            eq.add_term(Sign::Plus, expression);
            return eq;
        }

        let bytes = expression.as_bytes();
        let mut index = 0;
        while index < expression.len() {
            let sign = match bytes[index] {
                b'+' => {
                    index += 1;
                    Sign::Plus
                }
                b'-' => {
                    index += 1;
                    Sign::Minus
                }
                _ => Sign::Plus,
            };
            let end = find_delimiter(expression, index).unwrap_or(expression.len());
            eq.add_term(sign, &expression[index..end]);
            index = end;
        }
        eq
    }

    /// Creates an equation from the compile-time value of `node`, if the
    /// value oracle knows one: the node's minimum for [`Sign::Plus`], the
    /// negated maximum for [`Sign::Minus`]. Returns `None` when the oracle
    /// does not know; the caller falls back to [`OffsetEquation::from_node`].
    pub fn from_node_value(node: &ExprNode, sign: Sign, ctx: &dyn BoundsContext) -> Option<Self> {
        let value = match sign {
            Sign::Plus => ctx.min_value(node)?,
            Sign::Minus => -ctx.max_value(node)?,
        };
        debug!("from_node_value({}) = {}", node, value);
        Some(OffsetEquation::from_int(value))
    }

    /// Creates an equation from the structure of `node`.
    ///
    /// A node the resolver can name becomes a single signed term. An
    /// addition or subtraction node is recursed into, the right operand of
    /// a subtraction flipping the accumulating sign. Any other node
    /// poisons the equation with its textual form.
    pub fn from_node(node: &ExprNode, sign: Sign, ctx: &dyn BoundsContext) -> Self {
        let mut eq = OffsetEquation::from_int(0);
        eq.accumulate_node(node, sign, ctx);
        debug!("from_node({}, {}) = {}", node, sign, eq);
        eq
    }

    fn accumulate_node(&mut self, node: &ExprNode, sign: Sign, ctx: &dyn BoundsContext) {
        if let Some(name) = ctx.resolve(node) {
            self.add_term(sign, &name);
            return;
        }
        match node {
            ExprNode::Add(left, right) => {
                self.accumulate_node(left, sign, ctx);
                self.accumulate_node(right, sign, ctx);
            }
            ExprNode::Sub(left, right) => {
                self.accumulate_node(left, sign, ctx);
                self.accumulate_node(right, sign.flip(), ctx);
            }
            _ => self.error = Some(node.to_string()),
        }
    }

    /// True if this equation carries a parse/resolution error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// The error carried by this equation, if any.
    pub fn get_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True if this equation is a single integer constant.
    pub fn is_int(&self) -> bool {
        self.added_terms.is_empty() && self.subtracted_terms.is_empty()
    }

    /// The integer constant of this equation. The equation may also have
    /// symbolic terms; use [`OffsetEquation::is_int`] to check.
    pub fn get_int(&self) -> i64 {
        self.int_value
    }

    /// True if this equation is exactly `-1`.
    pub fn is_neg_one(&self) -> bool {
        self.is_int() && self.int_value == -1
    }

    /// True if this equation is an integer constant `>= 0`.
    pub fn is_non_negative(&self) -> bool {
        self.is_int() && self.int_value >= 0
    }

    /// True if this equation is an integer constant `<= 0`.
    pub fn is_negative_or_zero(&self) -> bool {
        self.is_int() && self.int_value <= 0
    }

    /// Returns `this + other` for [`Sign::Plus`] or `this - other` for
    /// [`Sign::Minus`]. Subtraction flips the sign of every one of
    /// `other`'s terms and negates its constant.
    pub fn copy_add(&self, sign: Sign, other: &OffsetEquation) -> Self {
        let mut copy = self.clone();
        if other.has_error() && copy.error.is_none() {
            copy.error = other.error.clone();
        }
        copy.add_int(sign.apply(other.int_value));
        for term in &other.added_terms {
            copy.add_term(sign, term);
        }
        for term in &other.subtracted_terms {
            copy.add_term(sign.flip(), term);
        }
        copy
    }

    /// Whether this equation is known to be less than or equal to `other`.
    ///
    /// True when both are integer constants ordered accordingly, or when
    /// the equations are structurally equal. Symbolic inequality between
    /// distinct expressions is never proven; this incompleteness is
    /// deliberate and keeps the subtype and lub rules conservative.
    pub fn less_than_or_equal(&self, other: &OffsetEquation) -> bool {
        (self.is_int() && other.is_int() && self.int_value <= other.int_value) || self == other
    }

    /// Returns a copy with every added term that is an access to the
    /// length of one of `sequences` removed, both the `s.length` and the
    /// `s.length()` renderings. Returns `None` if no term matched.
    pub fn remove_sequence_lengths<S: AsRef<str>>(&self, sequences: &[S]) -> Option<Self> {
        let mut copy = self.clone();
        let mut simplified = false;
        for sequence in sequences {
            let array_len = format!("{}.length", sequence.as_ref());
            let string_len = format!("{}.length()", sequence.as_ref());
            simplified |= copy.added_terms.remove(&array_len);
            simplified |= copy.added_terms.remove(&string_len);
        }
        if simplified {
            Some(copy)
        } else {
            None
        }
    }

    /// The member of `set` that is a pure integer constant, if any.
    pub fn int_equation_of(set: &BTreeSet<OffsetEquation>) -> Option<&OffsetEquation> {
        set.iter().find(|eq| eq.is_int())
    }

    /// Rewrites every term of this equation through the given parser,
    /// producing the equation's form at a use site. Terms the parser
    /// evaluates to constants fold into the integer part with their sign.
    /// A failed parse returns a copy poisoned with the failure message.
    pub fn viewpoint_adapt(&self, parser: &dyn FlowExprParser) -> Self {
        if self.has_error() {
            return self.clone();
        }
        let mut adapted = OffsetEquation::from_int(self.int_value);
        for (terms, sign) in [
            (&self.added_terms, Sign::Plus),
            (&self.subtracted_terms, Sign::Minus),
        ] {
            for term in terms {
                match parser.parse(term) {
                    Ok(Term::Name(name)) => adapted.add_term(sign, &name),
                    Ok(Term::Constant(value)) => adapted.add_int(sign.apply(value)),
                    Err(message) => {
                        debug!("viewpoint_adapt: {:?} failed: {}", term, message);
                        let mut poisoned = self.clone();
                        poisoned.error = Some(message);
                        return poisoned;
                    }
                }
            }
        }
        adapted
    }

    /// The symbolic term names this equation mentions, added and
    /// subtracted alike.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.added_terms
            .iter()
            .chain(self.subtracted_terms.iter())
            .map(String::as_str)
    }

    /// Adds `term` with the given sign. An integer literal (the empty
    /// string counts as `0`) folds into the constant. A symbolic term
    /// first cancels against the opposite set; only if absent there is it
    /// inserted, which keeps the representation minimal at all times.
    fn add_term(&mut self, sign: Sign, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        if let Ok(literal) = term.parse::<i64>() {
            self.add_int(sign.apply(literal));
            return;
        }
        let (opposite, own) = match sign {
            Sign::Plus => (&mut self.subtracted_terms, &mut self.added_terms),
            Sign::Minus => (&mut self.added_terms, &mut self.subtracted_terms),
        };
        if !opposite.remove(term) {
            own.insert(term.to_string());
        }
    }

    fn add_int(&mut self, value: i64) {
        self.int_value += value;
    }
}

/// First `+` or `-` in `expression` at or after `from`, if any.
fn find_delimiter(expression: &str, from: usize) -> Option<usize> {
    expression[from..]
        .find(&['+', '-'][..])
        .map(|offset| from + offset)
}

impl Display for OffsetEquation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            return write!(f, "{}", self.int_value);
        }
        let adds = self
            .added_terms
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" + ");
        let subs = self
            .subtracted_terms
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" - ");
        let minus = if self.subtracted_terms.len() == 1 && self.added_terms.is_empty() {
            format!("-{}", subs)
        } else if !self.subtracted_terms.is_empty() {
            format!(" - {}", subs)
        } else {
            String::new()
        };
        let mut terms = format!("{}{}", adds, minus).trim().to_string();
        if self.int_value != 0 {
            let sign = if self.int_value > 0 { '+' } else { '-' };
            terms = format!("{} {} {}", terms, sign, self.int_value.abs());
        }
        write!(f, "{}", terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::node::SimpleContext;

    #[test]
    fn test_from_int() {
        let eq = OffsetEquation::from_int(5);
        assert!(eq.is_int());
        assert_eq!(eq.get_int(), 5);
        assert_eq!(eq.to_string(), "5");
    }

    #[test]
    fn test_constants() {
        assert_eq!(OffsetEquation::ZERO, OffsetEquation::from_int(0));
        assert_eq!(OffsetEquation::NEG_1, OffsetEquation::from_int(-1));
        assert_eq!(OffsetEquation::ONE, OffsetEquation::from_int(1));
        assert!(OffsetEquation::NEG_1.is_neg_one());
        assert!(OffsetEquation::ZERO.is_non_negative());
        assert!(OffsetEquation::ZERO.is_negative_or_zero());
        assert!(!OffsetEquation::ONE.is_negative_or_zero());
    }

    #[test]
    fn test_from_expression_mixed() {
        let eq = OffsetEquation::from_expression("x + 3 - y");
        assert!(!eq.is_int());
        assert_eq!(eq.get_int(), 3);
        assert_eq!(eq.to_string(), "x - y + 3");
    }

    #[test]
    fn test_from_expression_empty_is_zero() {
        assert_eq!(OffsetEquation::from_expression(""), OffsetEquation::ZERO);
        assert_eq!(OffsetEquation::from_expression("   "), OffsetEquation::ZERO);
    }

    #[test]
    fn test_from_expression_single_term() {
        let eq = OffsetEquation::from_expression("buf.length");
        assert_eq!(eq.to_string(), "buf.length");
        assert_eq!(eq.get_int(), 0);
    }

    #[test]
    fn test_from_expression_leading_sign() {
        assert_eq!(OffsetEquation::from_expression("-5"), OffsetEquation::from_int(-5));
        assert_eq!(OffsetEquation::from_expression("+7"), OffsetEquation::from_int(7));
        let eq = OffsetEquation::from_expression("-x");
        assert_eq!(eq.to_string(), "-x");
    }

    #[test]
    fn test_from_expression_error_marker() {
        let marker = "[error for expression: a[i]]";
        assert!(is_expression_error(marker));
        let eq = OffsetEquation::from_expression(marker);
        assert!(eq.has_error());
        assert_eq!(eq.get_error(), Some(marker));
    }

    #[test]
    fn test_equality_is_set_based() {
        let ab = OffsetEquation::from_expression("a+b");
        let ba = OffsetEquation::from_expression("b+a");
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_cancellation() {
        let eq = OffsetEquation::from_expression("a + b - a");
        assert_eq!(eq, OffsetEquation::from_expression("b"));
    }

    #[test]
    fn test_copy_add_round_trip() {
        let e = OffsetEquation::from_expression("x - y + 2");
        let t = OffsetEquation::from_expression("t");
        let round = e.copy_add(Sign::Plus, &t).copy_add(Sign::Minus, &t);
        assert_eq!(round, e);
    }

    #[test]
    fn test_copy_add_subtraction_flips() {
        let a = OffsetEquation::from_expression("x + 1");
        let b = OffsetEquation::from_expression("y - z + 2");
        let diff = a.copy_add(Sign::Minus, &b);
        // x + 1 - (y - z + 2) = x - y + z - 1
        assert_eq!(diff, OffsetEquation::from_expression("x - y + z - 1"));
    }

    #[test]
    fn test_less_than_or_equal() {
        let two = OffsetEquation::from_int(2);
        let three = OffsetEquation::from_int(3);
        assert!(two.less_than_or_equal(&three));
        assert!(!three.less_than_or_equal(&two));

        let x = OffsetEquation::from_expression("x");
        assert!(x.less_than_or_equal(&x));
        // Symbolic inequality between distinct expressions is never proven.
        assert!(!x.less_than_or_equal(&three));
        assert!(!three.less_than_or_equal(&x));
    }

    #[test]
    fn test_remove_sequence_lengths() {
        let eq = OffsetEquation::from_expression("a.length - 2");
        let removed = eq.remove_sequence_lengths(&["a"]).unwrap();
        assert_eq!(removed, OffsetEquation::from_int(-2));

        assert!(eq.remove_sequence_lengths(&["b"]).is_none());

        let call = OffsetEquation::from_expression("s.length() + 1");
        let removed = call.remove_sequence_lengths(&["s"]).unwrap();
        assert_eq!(removed, OffsetEquation::ONE);
    }

    #[test]
    fn test_remove_sequence_lengths_ignores_subtracted() {
        // Only added length terms are stripped.
        let eq = OffsetEquation::from_expression("x - a.length");
        assert!(eq.remove_sequence_lengths(&["a"]).is_none());
    }

    #[test]
    fn test_int_equation_of() {
        let mut set = BTreeSet::new();
        set.insert(OffsetEquation::from_expression("x"));
        assert!(OffsetEquation::int_equation_of(&set).is_none());
        set.insert(OffsetEquation::from_int(4));
        assert_eq!(
            OffsetEquation::int_equation_of(&set),
            Some(&OffsetEquation::from_int(4))
        );
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(OffsetEquation::ZERO.to_string(), "0");
        assert_eq!(OffsetEquation::from_int(-3).to_string(), "-3");
        assert_eq!(OffsetEquation::from_expression("a + b").to_string(), "a + b");
        assert_eq!(
            OffsetEquation::from_expression("a - b - c").to_string(),
            "a - b - c"
        );
        assert_eq!(OffsetEquation::from_expression("-a - 1").to_string(), "-a - 1");
        assert_eq!(OffsetEquation::from_expression("b + a").to_string(), "a + b");
    }

    #[test]
    fn test_from_node_structural() {
        let ctx = SimpleContext::new();
        // i + (j - 2)
        let node = ExprNode::add(
            ExprNode::local("i"),
            ExprNode::sub(ExprNode::local("j"), ExprNode::literal(2)),
        );
        let eq = OffsetEquation::from_node(&node, Sign::Plus, &ctx);
        assert!(!eq.has_error());
        assert_eq!(eq, OffsetEquation::from_expression("i + j - 2"));

        let neg = OffsetEquation::from_node(&node, Sign::Minus, &ctx);
        assert_eq!(neg, OffsetEquation::from_expression("2 - i - j"));
    }

    #[test]
    fn test_from_node_unrepresentable() {
        let ctx = SimpleContext::new();
        let node = ExprNode::opaque("random()");
        let eq = OffsetEquation::from_node(&node, Sign::Plus, &ctx);
        assert!(eq.has_error());
        assert_eq!(eq.get_error(), Some("random()"));
    }

    #[test]
    fn test_from_node_value() {
        let mut ctx = SimpleContext::new();
        ctx.set_range("n", 3, 8);
        let n = ExprNode::local("n");
        assert_eq!(
            OffsetEquation::from_node_value(&n, Sign::Plus, &ctx),
            Some(OffsetEquation::from_int(3))
        );
        assert_eq!(
            OffsetEquation::from_node_value(&n, Sign::Minus, &ctx),
            Some(OffsetEquation::from_int(-8))
        );
        let m = ExprNode::local("m");
        assert_eq!(OffsetEquation::from_node_value(&m, Sign::Plus, &ctx), None);
    }

    struct SuffixParser;

    impl FlowExprParser for SuffixParser {
        fn parse(&self, term: &str) -> Result<Term, String> {
            match term {
                "k" => Ok(Term::Constant(4)),
                "bad" => Err("[error for expression: bad]".to_string()),
                _ => Ok(Term::Name(format!("this.{}", term))),
            }
        }
    }

    #[test]
    fn test_viewpoint_adapt() {
        let eq = OffsetEquation::from_expression("x + k - y");
        let adapted = eq.viewpoint_adapt(&SuffixParser);
        assert_eq!(adapted, OffsetEquation::from_expression("this.x - this.y + 4"));
    }

    #[test]
    fn test_viewpoint_adapt_failure_poisons() {
        let eq = OffsetEquation::from_expression("x + bad");
        let adapted = eq.viewpoint_adapt(&SuffixParser);
        assert!(adapted.has_error());
    }

    #[test]
    fn test_terms() {
        let eq = OffsetEquation::from_expression("a + b - c + 1");
        let terms: Vec<_> = eq.terms().collect();
        assert_eq!(terms, vec!["a", "b", "c"]);
    }
}
