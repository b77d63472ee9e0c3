pub mod calculators;
pub mod indicators;


pub use calculators::*;
pub use indicators::*;
