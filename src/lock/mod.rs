// Lock snapshot domain: modes, conflicts, lockable objects, requests

pub mod conflict;
pub mod object;
pub mod request;
pub mod types;

pub use conflict::*;
pub use object::*;
pub use request::*;
pub use types::*;
