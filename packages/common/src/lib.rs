pub mod diagnostics;
pub mod locator;

pub use diagnostics::*;
pub use locator::*;
