pub mod command;
pub mod error;
pub mod message;
pub mod reading;
pub mod render;
pub mod rule;
