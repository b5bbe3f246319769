//! Common structs for the retail recommendation setup shared across crates.

mod dataset;
mod filter;
mod policy;
mod recipe;
mod resource;
mod schema;
mod state_key;

pub use dataset::*;
pub use filter::*;
pub use policy::*;
pub use recipe::*;
pub use resource::*;
pub use schema::*;
pub use state_key::*;
