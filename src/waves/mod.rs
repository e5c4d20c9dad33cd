//! Wave building blocks
//!
//! From the bottom up:
//!
//! - **scanner**: forward scans for the next local high / low
//! - **monowave**: one directional swing, built from scanner results and a skip count
//! - **options**: skip-count tuples and their ascending enumeration
//! - **pattern**: labeled 2, 3 or 5 wave groups evaluated against rule sets
//! - **rules**: named conditions for impulses, diagonals, corrections and TD waves
//! - **cycle**: an impulse paired with the correction that follows it

pub mod cycle;
pub mod monowave;
pub mod options;
pub mod pattern;
pub mod rules;
pub mod scanner;

pub use cycle::*;
pub use monowave::*;
pub use options::*;
pub use pattern::*;
pub use rules::*;
pub use scanner::{first_high, first_low, next_high, next_low};
