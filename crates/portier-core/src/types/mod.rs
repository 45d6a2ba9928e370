//! Core types for Portier

mod access;
mod user;

pub use access::*;
pub use user::*;
