pub mod access;
pub mod authentication;
pub mod roles;
pub mod session;
pub mod user;

pub use access::*;
pub use authentication::*;
pub use roles::*;
pub use session::*;
pub use user::*;
