//! The upper-bound qualifier lattice.
//!
//! A [`UBQualifier`] is the abstract value the dataflow analysis attaches
//! to a numeric expression. The lattice is a closed set of three kinds:
//!
//! - [`UBQualifier::Unknown`] is top: nothing is known, always a sound
//!   over-approximation.
//! - [`UBQualifier::Bottom`] is the least element, used for unreachable or
//!   infeasible paths.
//! - [`UBQualifier::LessThanLengthOf`] maps sequence names to sets of
//!   alternative [`OffsetEquation`]s. For a sequence `a` mapped to
//!   `{e1, e2}` the fact is `value + e1 < length(a)` **or**
//!   `value + e2 < length(a)`; across different sequences in the map the
//!   facts all hold (conjunction).
//!
//! Every operation returns a fresh value; qualifiers are never mutated
//! once exposed. Sequence names and offset terms are pre-canonicalized
//! strings supplied by the enclosing framework's expression parser; the
//! lattice compares them only by string equality.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Display, Formatter};

use log::debug;

use crate::node::{BoundsContext, ExprNode};
use crate::offset::{FlowExprParser, OffsetEquation, Sign};

type OffsetMap = BTreeMap<String, BTreeSet<OffsetEquation>>;

/// Integer lub offsets below this value are widened away when the two
/// merge operands disagree, so a loop that keeps shifting a constant
/// offset (`-1`, `-2`, `-3`, ...) reaches a fixpoint once it crosses the
/// threshold instead of iterating forever. The value is empirical slack,
/// not a derived bound; it trades precision inside deep loops against the
/// number of iterations the fixpoint engine runs before giving up.
const WIDEN_THRESHOLD: i64 = -10;

/// An upper-bound fact over zero or more sequences. See the module
/// documentation for the lattice semantics.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum UBQualifier {
    /// Top: no bound is known.
    Unknown,
    /// Bottom: unreachable or infeasible.
    Bottom,
    /// `value + offset < length(sequence)` facts; see [`LessThanLengthOf`].
    LessThanLengthOf(LessThanLengthOf),
}

/// The payload of [`UBQualifier::LessThanLengthOf`]: a non-empty map from
/// sequence name to a non-empty set of alternative offset equations.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct LessThanLengthOf {
    map: OffsetMap,
}

impl UBQualifier {
    /// Creates a qualifier from parallel lists of sequence names and
    /// offset expressions. `sequences` must be non-empty; an empty
    /// `offsets` list means a zero offset for every sequence, otherwise
    /// the lists must have equal length. A repeated sequence name
    /// contributes an alternative offset to that sequence's set.
    ///
    /// If any offset expression fails to parse, the whole qualifier is
    /// [`UBQualifier::Unknown`]: a malformed fact cannot be trusted in
    /// part.
    pub fn create<S: AsRef<str>, T: AsRef<str>>(sequences: &[S], offsets: &[T]) -> UBQualifier {
        assert!(!sequences.is_empty(), "Sequence list should not be empty");
        let mut map = OffsetMap::new();
        if offsets.is_empty() {
            for sequence in sequences {
                map.entry(sequence.as_ref().to_string())
                    .or_default()
                    .insert(OffsetEquation::ZERO);
            }
        } else {
            assert_eq!(
                sequences.len(),
                offsets.len(),
                "Offsets should be empty or match sequences"
            );
            for (sequence, offset) in sequences.iter().zip(offsets) {
                let eq = OffsetEquation::from_expression(offset.as_ref());
                if eq.has_error() {
                    debug!("create: offset {:?} has error, widening to unknown", offset.as_ref());
                    return UBQualifier::Unknown;
                }
                map.entry(sequence.as_ref().to_string()).or_default().insert(eq);
            }
        }
        UBQualifier::LessThanLengthOf(LessThanLengthOf { map })
    }

    /// Convenience for a single sequence/offset pair.
    pub fn for_sequence(sequence: &str, offset: &str) -> UBQualifier {
        UBQualifier::create(&[sequence], &[offset])
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, UBQualifier::Unknown)
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, UBQualifier::Bottom)
    }

    /// The `LessThanLengthOf` payload, if this qualifier carries one.
    pub fn as_less_than_length_of(&self) -> Option<&LessThanLengthOf> {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => Some(ltl),
            _ => None,
        }
    }

    /// Whether this qualifier is a subtype of (conveys at least as much
    /// information as) `superty`.
    ///
    /// Everything is a subtype of Unknown; Bottom is a subtype of
    /// everything; nothing else is a subtype of Bottom. Between two
    /// `LessThanLengthOf` values, the subtype must cover every sequence of
    /// the supertype, and for each of the supertype's offsets some subtype
    /// offset must dominate it (be `>=` under
    /// [`OffsetEquation::less_than_or_equal`]).
    pub fn is_subtype(&self, superty: &UBQualifier) -> bool {
        match (self, superty) {
            (_, UBQualifier::Unknown) => true,
            (UBQualifier::Bottom, _) => true,
            (_, UBQualifier::Bottom) => false,
            (UBQualifier::Unknown, _) => false,
            (UBQualifier::LessThanLengthOf(sub), UBQualifier::LessThanLengthOf(sup)) => {
                sub.is_subtype(sup)
            }
        }
    }

    /// Least upper bound: the strongest fact implied by both operands,
    /// used at control-flow merges.
    ///
    /// Unknown absorbs; Bottom is the identity. Between two
    /// `LessThanLengthOf` values only sequences present in both survive,
    /// and for each survivor the offset set keeps, out of every cross
    /// pair, whichever equation the other dominates. The widening
    /// heuristic then runs on the raw result (see [`WIDEN_THRESHOLD`]);
    /// it only ever weakens the result, so the lattice laws are
    /// preserved, and it is what guarantees the enclosing fixpoint loop
    /// terminates.
    pub fn lub(&self, other: &UBQualifier) -> UBQualifier {
        match (self, other) {
            (UBQualifier::Unknown, _) | (_, UBQualifier::Unknown) => UBQualifier::Unknown,
            (UBQualifier::Bottom, q) => q.clone(),
            (q, UBQualifier::Bottom) => q.clone(),
            (UBQualifier::LessThanLengthOf(a), UBQualifier::LessThanLengthOf(b)) => a.lub(b),
        }
    }

    /// Greatest lower bound: the combined fact when both operands are
    /// known to hold, used for refinements.
    ///
    /// Bottom absorbs; Unknown is the identity. Between two
    /// `LessThanLengthOf` values the sequence sets union, the per-sequence
    /// offset sets union, and each merged set is simplified to keep all
    /// symbolic equations but only the single largest integer constant
    /// (the tightest integer bound).
    pub fn glb(&self, other: &UBQualifier) -> UBQualifier {
        match (self, other) {
            (UBQualifier::Bottom, _) | (_, UBQualifier::Bottom) => UBQualifier::Bottom,
            (UBQualifier::Unknown, q) => q.clone(),
            (q, UBQualifier::Unknown) => q.clone(),
            (UBQualifier::LessThanLengthOf(a), UBQualifier::LessThanLengthOf(b)) => a.glb(b),
        }
    }

    /// Adds `node` as an offset to a copy of this qualifier.
    ///
    /// The node is turned into an offset equation two ways, structurally
    /// and through the constant-value oracle, and each error-free
    /// candidate is applied to every offset in the map. When both
    /// derivations succeed the results are combined with [`UBQualifier::glb`];
    /// when neither does, the result is Unknown.
    pub fn plus_offset_for_node(&self, node: &ExprNode, ctx: &dyn BoundsContext) -> UBQualifier {
        self.plus_or_minus_offset(node, ctx, Sign::Plus)
    }

    /// Subtracts `node` as an offset; see [`UBQualifier::plus_offset_for_node`].
    pub fn minus_offset_for_node(&self, node: &ExprNode, ctx: &dyn BoundsContext) -> UBQualifier {
        self.plus_or_minus_offset(node, ctx, Sign::Minus)
    }

    fn plus_or_minus_offset(
        &self,
        node: &ExprNode,
        ctx: &dyn BoundsContext,
        sign: Sign,
    ) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return UBQualifier::Unknown,
        };

        let node_offset = OffsetEquation::from_node(node, sign, ctx);
        let node_qualifier = if node_offset.has_error() {
            None
        } else {
            ltl.add_offset(&node_offset).into_less_than_length_of()
        };

        let value_qualifier = OffsetEquation::from_node_value(node, sign, ctx)
            .and_then(|offset| ltl.add_offset(&offset).into_less_than_length_of());

        match (node_qualifier, value_qualifier) {
            (None, None) => UBQualifier::Unknown,
            (Some(q), None) | (None, Some(q)) => UBQualifier::LessThanLengthOf(q),
            (Some(a), Some(b)) => {
                UBQualifier::LessThanLengthOf(a).glb(&UBQualifier::LessThanLengthOf(b))
            }
        }
    }

    /// Adds `value` to every offset equation in a copy of this qualifier.
    pub fn plus_offset(&self, value: i64) -> UBQualifier {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => {
                ltl.add_offset(&OffsetEquation::from_int(value))
            }
            _ => UBQualifier::Unknown,
        }
    }

    /// Subtracts `value` from every offset equation in a copy of this
    /// qualifier.
    pub fn minus_offset(&self, value: i64) -> UBQualifier {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => {
                ltl.add_offset(&OffsetEquation::from_int(-value))
            }
            _ => UBQualifier::Unknown,
        }
    }

    /// The result of dividing a value with this qualifier by `divisor`.
    ///
    /// Division by one changes nothing. For a larger divisor only the
    /// pairs whose offset is a non-positive integer constant remain (a
    /// smaller non-negative value stays below the length). A divisor of
    /// zero or less yields Unknown.
    pub fn divide(&self, divisor: i64) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return UBQualifier::Unknown,
        };
        if divisor == 1 {
            self.clone()
        } else if divisor > 1 {
            ltl.compute_new_offsets(|eq| {
                if eq.is_negative_or_zero() {
                    Some(eq.clone())
                } else {
                    None
                }
            })
        } else {
            UBQualifier::Unknown
        }
    }

    /// Strips accesses to the lengths of `sequences` from every offset
    /// equation (see [`OffsetEquation::remove_sequence_lengths`]).
    /// Offsets with no such access are dropped; if nothing survives, the
    /// result is Unknown.
    pub fn remove_sequence_length_access<S: AsRef<str>>(&self, sequences: &[S]) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return UBQualifier::Unknown,
        };
        if sequences.is_empty() {
            return UBQualifier::Unknown;
        }
        ltl.compute_new_offsets(|eq| eq.remove_sequence_lengths(sequences))
    }

    /// Like [`UBQualifier::remove_sequence_length_access`], but an offset
    /// whose constant part is `-1` after the strip has [`OffsetEquation::ONE`]
    /// added back: the strict bound that justified the `-1` came from the
    /// removed length term.
    pub fn remove_sequence_length_access_and_neg1<S: AsRef<str>>(
        &self,
        sequences: &[S],
    ) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return UBQualifier::Unknown,
        };
        if sequences.is_empty() {
            return UBQualifier::Unknown;
        }
        ltl.compute_new_offsets(|eq| {
            let stripped = eq.remove_sequence_lengths(sequences)?;
            if stripped.get_int() == -1 {
                Some(stripped.copy_add(Sign::Plus, &OffsetEquation::ONE))
            } else {
                Some(stripped)
            }
        })
    }

    /// The qualifier of `value + 1` given this qualifier of `value`:
    /// every offset moves down the representable ladder by one, and an
    /// offset already at `-1` (the `<=` form) drops out, having no
    /// tighter symbolic bound to move to.
    pub fn value_incremented(&self) -> UBQualifier {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl.compute_new_offsets(|eq| {
                if eq.is_neg_one() {
                    None
                } else {
                    Some(eq.copy_add(Sign::Minus, &OffsetEquation::ONE))
                }
            }),
            _ => UBQualifier::Unknown,
        }
    }

    /// The qualifier of `value - 1` given this qualifier of `value`: the
    /// mirror image of [`UBQualifier::value_incremented`], dropping
    /// offsets already at `+1`.
    pub fn value_decremented(&self) -> UBQualifier {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl.compute_new_offsets(|eq| {
                if eq.is_int() && eq.get_int() == 1 {
                    None
                } else {
                    Some(eq.copy_add(Sign::Plus, &OffsetEquation::ONE))
                }
            }),
            _ => UBQualifier::Unknown,
        }
    }

    /// Is a value with this qualifier less than the length of `sequence`?
    pub fn is_less_than_length_of(&self, sequence: &str) -> bool {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl.is_less_than_length_of(sequence),
            _ => false,
        }
    }

    /// Is a value with this qualifier less than the length of any of the
    /// given sequences?
    pub fn is_less_than_length_of_any<S: AsRef<str>>(&self, sequences: &[S]) -> bool {
        sequences
            .iter()
            .any(|sequence| self.is_less_than_length_of(sequence.as_ref()))
    }

    /// Does this qualifier track `sequence` with the given constant
    /// offset?
    pub fn has_sequence_with_offset(&self, sequence: &str, offset: i64) -> bool {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl
                .map
                .get(sequence)
                .is_some_and(|offsets| offsets.contains(&OffsetEquation::from_int(offset))),
            _ => false,
        }
    }

    /// Does this qualifier track `sequence` with the given offset
    /// expression?
    pub fn has_sequence_with_offset_expr(&self, sequence: &str, offset: &str) -> bool {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => {
                let target = OffsetEquation::from_expression(offset);
                ltl.map
                    .get(sequence)
                    .is_some_and(|offsets| offsets.contains(&target))
            }
            _ => false,
        }
    }

    /// Is a value with this qualifier less than or equal to the length of
    /// `sequence`?
    pub fn is_less_than_or_equal_to(&self, sequence: &str) -> bool {
        self.is_less_than_length_of(sequence) || self.has_sequence_with_offset(sequence, -1)
    }

    /// Discharges a bounds check numerically: given the concrete `value`
    /// of the indexing expression and a known minimum length of
    /// `sequence`, checks `min_len > value + offset` for the sequence's
    /// integer offset equation (the set is assumed to hold a single
    /// integer equation in this use).
    pub fn is_value_plus_offset_less_than_min_len(
        &self,
        sequence: &str,
        value: i64,
        min_len: i64,
    ) -> bool {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return false,
        };
        let Some(offsets) = ltl.map.get(sequence) else {
            return false;
        };
        match OffsetEquation::int_equation_of(offsets) {
            Some(offset) => min_len - offset.get_int() > value,
            None => false,
        }
    }

    /// A copy of this qualifier without the given (sequence, offset)
    /// pair. Other offsets of the sequence, and other sequences, remain.
    pub fn remove_offset(&self, sequence: &str, offset: i64) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return UBQualifier::Unknown,
        };
        let target = OffsetEquation::from_int(offset);
        let mut map = ltl.map.clone();
        if let Some(offsets) = map.get_mut(sequence) {
            offsets.remove(&target);
            if offsets.is_empty() {
                map.remove(sequence);
            }
        }
        if map.is_empty() {
            UBQualifier::Unknown
        } else {
            UBQualifier::LessThanLengthOf(LessThanLengthOf { map })
        }
    }

    /// Rewrites every offset equation through the framework's
    /// flow-expression parser, specializing a declaration-site qualifier
    /// to a use site. Sequence names are assumed already canonical for
    /// the use site. A term that fails to parse collapses the whole
    /// qualifier to Unknown.
    pub fn viewpoint_adapt(&self, parser: &dyn FlowExprParser) -> UBQualifier {
        let ltl = match self {
            UBQualifier::LessThanLengthOf(ltl) => ltl,
            _ => return self.clone(),
        };
        let mut new_map = OffsetMap::new();
        for (sequence, offsets) in &ltl.map {
            let mut adapted = BTreeSet::new();
            for eq in offsets {
                let new_eq = eq.viewpoint_adapt(parser);
                if new_eq.has_error() {
                    debug!("viewpoint_adapt: {} poisoned, widening to unknown", eq);
                    return UBQualifier::Unknown;
                }
                adapted.insert(new_eq);
            }
            new_map.insert(sequence.clone(), adapted);
        }
        UBQualifier::LessThanLengthOf(LessThanLengthOf { map: new_map })
    }

    /// The symbolic names this qualifier depends on: the tracked sequence
    /// names plus every non-integer offset term. Downstream invalidation
    /// drops the qualifier when any of these is reassigned.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        if let UBQualifier::LessThanLengthOf(ltl) = self {
            for (sequence, offsets) in &ltl.map {
                names.insert(sequence.clone());
                for eq in offsets {
                    names.extend(eq.terms().map(str::to_string));
                }
            }
        }
        names
    }
}

impl LessThanLengthOf {
    pub(crate) fn map(&self) -> &OffsetMap {
        &self.map
    }

    /// The sequence names this qualifier constrains.
    pub fn sequences(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// Whether replacing `sequence` by `replacement` in this qualifier
    /// reproduces the `replacement` entry of `other`: the two offset sets
    /// must be equal.
    pub fn is_valid_replacement(
        &self,
        sequence: &str,
        replacement: &str,
        other: &LessThanLengthOf,
    ) -> bool {
        match (self.map.get(sequence), other.map.get(replacement)) {
            (Some(offsets), Some(other_offsets)) => offsets == other_offsets,
            _ => false,
        }
    }

    fn is_less_than_length_of(&self, sequence: &str) -> bool {
        let Some(offsets) = self.map.get(sequence) else {
            return false;
        };
        // An empty set is only reachable transiently and means an
        // unconditional zero offset.
        offsets.is_empty() || offsets.iter().any(OffsetEquation::is_non_negative)
    }

    fn is_subtype(&self, superty: &LessThanLengthOf) -> bool {
        for (sequence, super_offsets) in &superty.map {
            let Some(sub_offsets) = self.map.get(sequence) else {
                return false;
            };
            // Every super offset needs some sub offset dominating it.
            let covered = super_offsets.iter().all(|super_offset| {
                sub_offsets
                    .iter()
                    .any(|sub_offset| super_offset.less_than_or_equal(sub_offset))
            });
            if !covered {
                return false;
            }
        }
        true
    }

    fn lub(&self, other: &LessThanLengthOf) -> UBQualifier {
        let mut lub_map = OffsetMap::new();
        for (sequence, offsets1) in &self.map {
            let Some(offsets2) = other.map.get(sequence) else {
                continue;
            };
            let mut lub = BTreeSet::new();
            for offset1 in offsets1 {
                for offset2 in offsets2 {
                    if offset2.less_than_or_equal(offset1) {
                        lub.insert(offset2.clone());
                    } else if offset1.less_than_or_equal(offset2) {
                        lub.insert(offset1.clone());
                    }
                }
            }
            if !lub.is_empty() {
                lub_map.insert(sequence.clone(), lub);
            }
        }

        self.widen_lub(other, &mut lub_map);

        if lub_map.is_empty() {
            debug!("lub: no sequences survived, result is unknown");
            return UBQualifier::Unknown;
        }
        UBQualifier::LessThanLengthOf(LessThanLengthOf { map: lub_map })
    }

    /// The widening half of [`LessThanLengthOf::lub`].
    ///
    /// A loop like
    ///
    /// ```text
    /// // i constrained by: i < a.len()
    /// while cond {
    ///     i += 1;
    /// }
    /// ```
    ///
    /// never converges without help: each pass through the merge point
    /// shifts the constant offset by one more (`-1`, `-2`, `-3`, ...).
    /// When the raw lub kept every sequence of both operands with the same
    /// offset counts, any integer lub offset on which the operands
    /// disagree and which has sunk below [`WIDEN_THRESHOLD`] is removed
    /// from the result; a sequence whose offsets all vanish is removed
    /// with it. The caller maps a fully emptied result to Unknown.
    fn widen_lub(&self, other: &LessThanLengthOf, lub_map: &mut OffsetMap) {
        if !same_keys(&self.map, lub_map) || !same_keys(&other.map, lub_map) {
            return;
        }
        let mut remove: Vec<(String, OffsetEquation)> = Vec::new();
        for (sequence, lub_offsets) in lub_map.iter() {
            let this_offsets = &self.map[sequence];
            let other_offsets = &other.map[sequence];
            if lub_offsets.len() != this_offsets.len() || lub_offsets.len() != other_offsets.len() {
                return;
            }
            for lub_eq in lub_offsets {
                if lub_eq.is_int() {
                    let this_int = OffsetEquation::int_equation_of(this_offsets);
                    let other_int = OffsetEquation::int_equation_of(other_offsets);
                    let (Some(this_int), Some(other_int)) = (this_int, other_int) else {
                        // An operand without an integer offset has nothing
                        // to compare against.
                        return;
                    };
                    if this_int.get_int() != other_int.get_int()
                        && lub_eq.get_int() < WIDEN_THRESHOLD
                    {
                        debug!(
                            "widen: dropping ({}, {}) (operands {} and {})",
                            sequence,
                            lub_eq,
                            this_int,
                            other_int
                        );
                        remove.push((sequence.clone(), lub_eq.clone()));
                    }
                } else if !(this_offsets.contains(lub_eq) && other_offsets.contains(lub_eq)) {
                    return;
                }
            }
        }
        for (sequence, eq) in remove {
            if let Some(offsets) = lub_map.get_mut(&sequence) {
                offsets.remove(&eq);
                if offsets.is_empty() {
                    lub_map.remove(&sequence);
                }
            }
        }
    }

    fn glb(&self, other: &LessThanLengthOf) -> UBQualifier {
        let mut glb_map = OffsetMap::new();
        let sequences: BTreeSet<&String> = self.map.keys().chain(other.map.keys()).collect();
        for sequence in sequences {
            let mut union = BTreeSet::new();
            if let Some(offsets) = self.map.get(sequence) {
                union.extend(offsets.iter().cloned());
            }
            if let Some(offsets) = other.map.get(sequence) {
                union.extend(offsets.iter().cloned());
            }
            glb_map.insert(sequence.clone(), simplify_ints(union));
        }
        UBQualifier::LessThanLengthOf(LessThanLengthOf { map: glb_map })
    }

    fn add_offset(&self, new_offset: &OffsetEquation) -> UBQualifier {
        self.compute_new_offsets(|eq| Some(eq.copy_add(Sign::Plus, new_offset)))
    }

    /// Applies `f` to every offset equation in a copy of this map. A
    /// `None` result drops the equation; a sequence left with no offsets
    /// is dropped; an emptied map collapses to Unknown.
    fn compute_new_offsets<F>(&self, f: F) -> UBQualifier
    where
        F: Fn(&OffsetEquation) -> Option<OffsetEquation>,
    {
        let mut new_map = OffsetMap::new();
        for (sequence, offsets) in &self.map {
            let new_offsets: BTreeSet<OffsetEquation> = offsets.iter().filter_map(&f).collect();
            if !new_offsets.is_empty() {
                new_map.insert(sequence.clone(), new_offsets);
            }
        }
        if new_map.is_empty() {
            UBQualifier::Unknown
        } else {
            UBQualifier::LessThanLengthOf(LessThanLengthOf { map: new_map })
        }
    }
}

impl UBQualifier {
    fn into_less_than_length_of(self) -> Option<LessThanLengthOf> {
        match self {
            UBQualifier::LessThanLengthOf(ltl) => Some(ltl),
            _ => None,
        }
    }
}

/// Keeps every symbolic equation but collapses the integer equations down
/// to the single largest one, the tightest integer bound.
fn simplify_ints(offsets: BTreeSet<OffsetEquation>) -> BTreeSet<OffsetEquation> {
    let mut simplified = BTreeSet::new();
    let mut literal: Option<OffsetEquation> = None;
    for eq in offsets {
        if eq.is_int() {
            literal = match literal {
                None => Some(eq),
                Some(best) => {
                    if best.less_than_or_equal(&eq) {
                        Some(eq)
                    } else {
                        Some(best)
                    }
                }
            };
        } else {
            simplified.insert(eq);
        }
    }
    if let Some(literal) = literal {
        simplified.insert(literal);
    }
    simplified
}

fn same_keys(a: &OffsetMap, b: &OffsetMap) -> bool {
    a.len() == b.len() && a.keys().all(|key| b.contains_key(key))
}

impl Display for UBQualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UBQualifier::Unknown => write!(f, "UNKNOWN"),
            UBQualifier::Bottom => write!(f, "BOTTOM"),
            UBQualifier::LessThanLengthOf(ltl) => {
                write!(f, "LessThanLengthOf{{")?;
                let mut first = true;
                for (sequence, offsets) in &ltl.map {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    let rendered: Vec<String> =
                        offsets.iter().map(OffsetEquation::to_string).collect();
                    write!(f, "{}: [{}]", sequence, rendered.join(", "))?;
                }
                write!(f, "}}")
            }
        }
    }
}
