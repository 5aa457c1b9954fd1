//! Application services layer.

pub mod accounts;
pub mod authors;
pub mod categories;
pub mod dashboard;
pub mod episodes;
pub mod error;
pub mod guests;
pub mod identity;
pub mod pagination;
pub mod publication;
pub mod render;
pub mod repos;
pub mod submissions;
pub mod uploads;
