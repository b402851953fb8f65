//! Registration and login.

pub mod dto;
pub mod handlers;
pub mod password;

pub use handlers::handle;
