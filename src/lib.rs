pub mod app;
pub mod auth;
pub mod config;
pub mod courses;
pub mod db;
pub mod error;
pub mod gateway;
pub mod i18n;
pub mod state;
