pub mod bridge;
pub mod bus;
pub mod cache;

pub use bridge::*;
pub use bus::*;
pub use cache::*;
