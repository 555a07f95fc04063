//! Static single assignment construction (§4.5).
//!
//! SSA destruction is explicitly out of scope; passes that need
//! non-SSA output (none currently do — every optimization in
//! [`crate::opt`] is sound to run on either form) would live here too.

mod construct;

pub use construct::convert;
