#[macro_use]
extern crate serde;

pub mod models;
pub use models::*;
