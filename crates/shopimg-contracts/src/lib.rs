pub mod catalog;
pub mod config;
pub mod errors;
pub mod events;
pub mod images;
pub mod runs;
