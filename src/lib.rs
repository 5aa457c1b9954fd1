//! Peak Life Journey content service: podcast episodes, the blog, guest
//! submissions and their editorial review.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
