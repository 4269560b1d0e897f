pub mod extract;
pub mod store;
pub mod transcribe;

pub use extract::*;
pub use store::*;
pub use transcribe::*;
