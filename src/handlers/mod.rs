pub mod articles;
pub mod auth;
