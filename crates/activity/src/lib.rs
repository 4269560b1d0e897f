pub mod client;
pub mod display;

pub use client::*;
pub use display::*;
