//! # upperbound-rs: an upper-bound qualifier lattice for index safety
//!
//! **`upperbound-rs`** is the symbolic core of an abstract-interpretation
//! engine that proves array-index safety at compile time. For each numeric
//! expression the enclosing dataflow analysis tracks facts of the form
//! `value + offset < length(sequence)`; this crate supplies the values
//! those facts are made of and the algebra that combines them.
//!
//! ## The two components
//!
//! - **[`OffsetEquation`][crate::offset::OffsetEquation]** is a normalized
//!   symbolic linear offset: a set of added term names, a set of
//!   subtracted term names, and an integer constant. Terms cancel eagerly
//!   on insertion, so equality is plain set comparison.
//! - **[`UBQualifier`][crate::qualifier::UBQualifier]** is the abstract
//!   value attached to a program expression: *Unknown* (top), *Bottom*
//!   (unreachable), or *LessThanLengthOf*, a map from sequence name to a
//!   set of alternative offset equations. Subtyping, least upper bound,
//!   greatest lower bound, and the arithmetic transfers are methods over
//!   this closed set of variants, matched exhaustively so no combination
//!   goes unhandled.
//!
//! ## Termination
//!
//! A loop that keeps incrementing an index would push its offset through
//! `-1`, `-2`, `-3`, ... forever. The lub therefore widens: when two merge
//! operands agree on everything but an integer offset that has sunk below
//! a threshold, the offending entry is dropped and the bound degrades to
//! Unknown. This heuristic, not any timeout, is what guarantees the
//! enclosing fixpoint loop converges.
//!
//! ## Everything is a value
//!
//! The algebra is pure: qualifiers and equations are immutable, every
//! operation returns a fresh value, and malformed input degrades the
//! value (an error-tagged equation, an Unknown qualifier) instead of
//! raising an error. Sequence names and offset terms are canonicalized
//! strings supplied by the enclosing framework; the core compares them
//! only by string equality.
//!
//! ## Basic usage
//!
//! ```rust
//! use upperbound_rs::qualifier::UBQualifier;
//!
//! // i is a valid index: i < buf.length
//! let i = UBQualifier::for_sequence("buf", "0");
//! assert!(i.is_less_than_length_of("buf"));
//!
//! // After i + 1 the fact weakens to i + 1 <= buf.length.
//! let next = i.value_incremented();
//! assert!(!next.is_less_than_length_of("buf"));
//! assert!(next.is_less_than_or_equal_to("buf"));
//!
//! // Merging with a path that knows nothing loses the bound.
//! assert!(i.lub(&UBQualifier::Unknown).is_unknown());
//! ```
//!
//! ## Core components
//!
//! - **[`offset`]**: the offset-equation algebra.
//! - **[`qualifier`]**: the qualifier lattice and arithmetic transfers.
//! - **[`annotation`]**: the surface annotation forms and their
//!   (de)serialization.
//! - **[`node`]**: the expression-node model and the seam traits the
//!   enclosing framework implements.

pub mod annotation;
pub mod node;
pub mod offset;
pub mod qualifier;
