pub mod binder;
pub mod cache;
pub mod coord;
pub mod provider;
pub mod resolver;

pub use binder::*;
pub use cache::*;
pub use coord::*;
pub use provider::*;
pub use resolver::*;
