//! Walks the classic non-terminating loop pattern to a fixpoint.
//!
//! ```text
//! // i < buf.length
//! while cond {
//!     i += 1;
//! }
//! ```
//!
//! Each pass through the merge point lowers the stored integer offset by
//! one; the widening inside lub is what stops the chain. Run with
//! `--verbose` to see the lattice operations fire.

use clap::Parser;

use upperbound_rs::qualifier::UBQualifier;

#[derive(Parser)]
#[command(about = "Iterate a decrementing-offset loop merge to a fixpoint")]
struct Args {
    /// Sequence name the index is bounded by.
    #[arg(long, default_value = "buf")]
    sequence: String,

    /// Give up after this many merge iterations.
    #[arg(long, default_value_t = 64)]
    max_iterations: usize,

    /// Log the lattice operations as they run.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    simplelog::TermLogger::init(
        if args.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let mut stored = UBQualifier::for_sequence(&args.sequence, "0");
    println!("entry: {}", stored);

    for iteration in 1..=args.max_iterations {
        // i += 1 shifts every offset down by one.
        let incremented = stored.minus_offset(1);
        let merged = stored.lub(&incremented);
        println!("after pass {:2}: {}", iteration, merged);
        if merged == stored {
            println!("fixpoint reached in {} iterations", iteration);
            println!("surface form: {}", stored.to_annotation());
            return Ok(());
        }
        stored = merged;
    }

    println!("no fixpoint within {} iterations", args.max_iterations);
    Ok(())
}
