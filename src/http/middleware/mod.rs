//! Request middleware applied in front of the file handler.

pub mod auth;

pub use auth::{auth_middleware, AuthInterceptor};
