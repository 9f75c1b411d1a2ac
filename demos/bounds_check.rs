//! Discharges a handful of array accesses with the query API.

use upperbound_rs::annotation::BoundAnnotation;
use upperbound_rs::node::{ExprNode, SimpleContext};
use upperbound_rs::qualifier::UBQualifier;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    // `i` comes annotated as a valid index for `buf`.
    let anno = BoundAnnotation::lt_length_of(&["buf"], &["0"]);
    let i = UBQualifier::from_annotation(&anno);
    println!("i: {}", i);
    println!("buf[i] safe: {}", i.is_less_than_length_of("buf"));

    // buf[i + 1] is not provably safe, but i + 1 is a valid fill bound.
    let next = i.value_incremented();
    println!("i + 1: {}", next);
    println!("buf[i + 1] safe: {}", next.is_less_than_length_of("buf"));
    println!("i + 1 <= buf.length: {}", next.is_less_than_or_equal_to("buf"));

    // Halving a non-positive offset keeps the bound.
    let mid = i.divide(2);
    println!("i / 2: {}", mid);

    // i + j where j has a known compile-time range.
    let mut ctx = SimpleContext::new();
    ctx.set_range("j", 0, 3);
    let sum = i.minus_offset_for_node(&ExprNode::local("j"), &ctx);
    println!("i + j: {}", sum);

    // A concrete index against a known minimum length.
    let q = UBQualifier::for_sequence("buf", "0");
    println!(
        "value 4 with min length 10: {}",
        q.is_value_plus_offset_less_than_min_len("buf", 4, 10)
    );

    println!("dependencies of i: {:?}", i.dependencies());

    Ok(())
}
