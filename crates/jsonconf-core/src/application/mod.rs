//! Application layer: the store that ties the domain logic to a file.
//!
//! - **`store`** – [`store::ConfigStore`], its builder, and the
//!   read-modify-write cycle shared by the async and blocking APIs.

pub mod store;
