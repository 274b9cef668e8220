//! CLI commands implementation

pub mod check;
pub mod status;
pub mod sync;

pub use check::*;
pub use status::*;
pub use sync::*;
