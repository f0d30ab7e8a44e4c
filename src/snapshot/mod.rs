// Lock snapshot acquisition and partitioning

pub mod partition;
pub mod source;

pub use partition::*;
pub use source::*;
