//! Surface annotation forms.
//!
//! The analysis front end stores upper-bound facts in one of a few
//! annotation shapes. [`BoundAnnotation`] models them:
//!
//! - `LtLengthOf` is the general form: parallel lists of sequence names
//!   and offset expressions, meaning `value + offset_i < length(seq_i)`
//!   for each pair.
//! - `LtEqLengthOf` is shorthand for an offset of `-1` on every sequence
//!   (`value <= length(seq)`).
//! - `LtomLengthOf` is shorthand for an offset of `1` on every sequence
//!   (`value < length(seq) - 1`).
//!
//! Conversion to a qualifier normalizes the shorthands to their constant
//! offsets before hitting the shared constructor; conversion back picks
//! the most specific shape that represents the qualifier exactly, with
//! sequences and offsets sorted so equal qualifiers always render as
//! equal annotations.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use crate::offset::OffsetEquation;
use crate::qualifier::UBQualifier;

/// A surface upper-bound annotation. See the module documentation.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum BoundAnnotation {
    Unknown,
    Bottom,
    LtLengthOf {
        sequences: Vec<String>,
        offsets: Vec<String>,
    },
    LtEqLengthOf {
        sequences: Vec<String>,
    },
    LtomLengthOf {
        sequences: Vec<String>,
    },
}

impl BoundAnnotation {
    /// Builds the general form from anything string-like.
    pub fn lt_length_of<S: AsRef<str>, T: AsRef<str>>(
        sequences: &[S],
        offsets: &[T],
    ) -> BoundAnnotation {
        BoundAnnotation::LtLengthOf {
            sequences: sequences.iter().map(|s| s.as_ref().to_string()).collect(),
            offsets: offsets.iter().map(|o| o.as_ref().to_string()).collect(),
        }
    }

    /// The symbolic names the annotation depends on: its sequences plus
    /// every non-integer term of its offsets. A store invalidates facts
    /// whose dependencies are reassigned.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        match self {
            BoundAnnotation::Unknown | BoundAnnotation::Bottom => {}
            BoundAnnotation::LtLengthOf { sequences, offsets } => {
                names.extend(sequences.iter().cloned());
                for offset in offsets {
                    let eq = OffsetEquation::from_expression(offset);
                    names.extend(eq.terms().map(str::to_string));
                }
            }
            BoundAnnotation::LtEqLengthOf { sequences }
            | BoundAnnotation::LtomLengthOf { sequences } => {
                names.extend(sequences.iter().cloned());
            }
        }
        names
    }
}

impl UBQualifier {
    /// Creates a qualifier from a surface annotation. The shorthand forms
    /// normalize to constant offsets of `-1` and `1`; an annotation with
    /// no sequences, or any offset that fails to parse, gives Unknown.
    pub fn from_annotation(annotation: &BoundAnnotation) -> UBQualifier {
        match annotation {
            BoundAnnotation::Unknown => UBQualifier::Unknown,
            BoundAnnotation::Bottom => UBQualifier::Bottom,
            BoundAnnotation::LtLengthOf { sequences, offsets } => {
                if sequences.is_empty() {
                    return UBQualifier::Unknown;
                }
                UBQualifier::create(sequences, offsets)
            }
            BoundAnnotation::LtEqLengthOf { sequences } => {
                if sequences.is_empty() {
                    return UBQualifier::Unknown;
                }
                let offsets = vec!["-1"; sequences.len()];
                UBQualifier::create(sequences, &offsets)
            }
            BoundAnnotation::LtomLengthOf { sequences } => {
                if sequences.is_empty() {
                    return UBQualifier::Unknown;
                }
                let offsets = vec!["1"; sequences.len()];
                UBQualifier::create(sequences, &offsets)
            }
        }
    }

    /// Converts this qualifier to the most specific surface form that
    /// represents it exactly: `LtEqLengthOf` when every offset is `-1`,
    /// `LtomLengthOf` when every offset is `1`, otherwise the general
    /// form. Sequences and their offsets come out sorted, so equal
    /// qualifiers produce identical annotations.
    pub fn to_annotation(&self) -> BoundAnnotation {
        let ltl = match self {
            UBQualifier::Unknown => return BoundAnnotation::Unknown,
            UBQualifier::Bottom => return BoundAnnotation::Bottom,
            UBQualifier::LessThanLengthOf(ltl) => ltl,
        };
        let mut sequences = Vec::new();
        let mut offsets = Vec::new();
        let mut is_lt_eq = true;
        let mut is_ltom = true;
        for (sequence, eqs) in ltl.map() {
            let mut rendered: Vec<String> = Vec::new();
            for eq in eqs {
                is_lt_eq = is_lt_eq && *eq == OffsetEquation::NEG_1;
                is_ltom = is_ltom && *eq == OffsetEquation::ONE;
                rendered.push(eq.to_string());
            }
            rendered.sort();
            for offset in rendered {
                sequences.push(sequence.clone());
                offsets.push(offset);
            }
        }
        if is_lt_eq {
            BoundAnnotation::LtEqLengthOf { sequences }
        } else if is_ltom {
            BoundAnnotation::LtomLengthOf { sequences }
        } else {
            BoundAnnotation::LtLengthOf { sequences, offsets }
        }
    }
}

fn write_quoted(f: &mut Formatter<'_>, items: &[String]) -> fmt::Result {
    let mut first = true;
    for item in items {
        if !first {
            write!(f, ", ")?;
        }
        first = false;
        write!(f, "{:?}", item)?;
    }
    Ok(())
}

impl Display for BoundAnnotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BoundAnnotation::Unknown => write!(f, "UpperBoundUnknown"),
            BoundAnnotation::Bottom => write!(f, "UpperBoundBottom"),
            BoundAnnotation::LtLengthOf { sequences, offsets } => {
                write!(f, "LTLengthOf(value = [")?;
                write_quoted(f, sequences)?;
                write!(f, "], offset = [")?;
                write_quoted(f, offsets)?;
                write!(f, "])")
            }
            BoundAnnotation::LtEqLengthOf { sequences } => {
                write!(f, "LTEqLengthOf(")?;
                write_quoted(f, sequences)?;
                write!(f, ")")
            }
            BoundAnnotation::LtomLengthOf { sequences } => {
                write!(f, "LTOMLengthOf(")?;
                write_quoted(f, sequences)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_round_trip() {
        let anno = BoundAnnotation::lt_length_of(&["b", "a"], &["x", "-1"]);
        let q = UBQualifier::from_annotation(&anno);
        let back = q.to_annotation();
        // Canonical output: sequences sorted, offsets alongside.
        assert_eq!(back, BoundAnnotation::lt_length_of(&["a", "b"], &["-1", "x"]));
        // A second round trip is stable.
        assert_eq!(UBQualifier::from_annotation(&back).to_annotation(), back);
    }

    #[test]
    fn test_lt_eq_specialization() {
        let q = UBQualifier::create(&["a", "b"], &["-1", "-1"]);
        assert_eq!(
            q.to_annotation(),
            BoundAnnotation::LtEqLengthOf {
                sequences: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn test_ltom_specialization() {
        let q = UBQualifier::for_sequence("a", "1");
        assert_eq!(
            q.to_annotation(),
            BoundAnnotation::LtomLengthOf {
                sequences: vec!["a".to_string()],
            }
        );
    }

    #[test]
    fn test_mixed_offsets_stay_general() {
        let q = UBQualifier::create(&["a", "b"], &["-1", "1"]);
        let anno = q.to_annotation();
        assert_eq!(anno, BoundAnnotation::lt_length_of(&["a", "b"], &["-1", "1"]));
    }

    #[test]
    fn test_shorthand_normalization() {
        let lteq = BoundAnnotation::LtEqLengthOf {
            sequences: vec!["a".to_string()],
        };
        let q = UBQualifier::from_annotation(&lteq);
        assert!(q.has_sequence_with_offset("a", -1));
        assert!(q.is_less_than_or_equal_to("a"));

        let ltom = BoundAnnotation::LtomLengthOf {
            sequences: vec!["a".to_string()],
        };
        let q = UBQualifier::from_annotation(&ltom);
        assert!(q.has_sequence_with_offset("a", 1));
    }

    #[test]
    fn test_empty_offsets_mean_zero() {
        let anno = BoundAnnotation::lt_length_of::<_, &str>(&["a"], &[]);
        let q = UBQualifier::from_annotation(&anno);
        assert!(q.has_sequence_with_offset("a", 0));
    }

    #[test]
    fn test_empty_sequences_are_unknown() {
        let anno = BoundAnnotation::LtEqLengthOf { sequences: vec![] };
        assert!(UBQualifier::from_annotation(&anno).is_unknown());
    }

    #[test]
    fn test_parse_error_collapses() {
        let anno = BoundAnnotation::lt_length_of(&["a"], &["[error for expression: e]"]);
        assert!(UBQualifier::from_annotation(&anno).is_unknown());
    }

    #[test]
    fn test_unknown_bottom_round_trip() {
        assert_eq!(
            UBQualifier::from_annotation(&BoundAnnotation::Unknown).to_annotation(),
            BoundAnnotation::Unknown
        );
        assert_eq!(
            UBQualifier::from_annotation(&BoundAnnotation::Bottom).to_annotation(),
            BoundAnnotation::Bottom
        );
    }

    #[test]
    fn test_dependencies() {
        let anno = BoundAnnotation::lt_length_of(&["a", "b"], &["x - y", "2"]);
        let deps = anno.dependencies();
        let expected: BTreeSet<String> =
            ["a", "b", "x", "y"].iter().map(|s| s.to_string()).collect();
        assert_eq!(deps, expected);

        assert!(BoundAnnotation::Unknown.dependencies().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(BoundAnnotation::Unknown.to_string(), "UpperBoundUnknown");
        let anno = BoundAnnotation::lt_length_of(&["a", "b"], &["-1", "x"]);
        assert_eq!(
            anno.to_string(),
            r#"LTLengthOf(value = ["a", "b"], offset = ["-1", "x"])"#
        );
        let lteq = BoundAnnotation::LtEqLengthOf {
            sequences: vec!["a".to_string()],
        };
        assert_eq!(lteq.to_string(), r#"LTEqLengthOf("a")"#);
    }
}
