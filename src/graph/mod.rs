// Wait-For Graph: construction, reduction to cycles, victim selection

pub mod builder;
pub mod kill;
pub mod reduce;
pub mod wait_for;

pub use wait_for::*;
