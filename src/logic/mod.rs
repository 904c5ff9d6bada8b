pub mod access;
pub mod instance_ops;
pub mod links;
pub mod naming;
pub mod path_data_ops;
pub mod rebase;

pub use access::*;
pub use instance_ops::*;
pub use links::*;
pub use path_data_ops::*;
pub use rebase::*;
