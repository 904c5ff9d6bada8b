pub mod acl;
pub mod baseline;
pub mod binary;
pub mod common;
pub mod instance;
pub mod keys;
pub mod pathdata;
pub mod user;

pub use acl::*;
pub use baseline::*;
pub use binary::*;
pub use common::*;
pub use instance::*;
pub use keys::*;
pub use pathdata::*;
pub use user::*;
