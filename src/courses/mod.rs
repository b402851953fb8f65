//! Course listing and enrollment.

pub mod dto;
pub mod handlers;

pub use handlers::handle;
