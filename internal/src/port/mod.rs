pub mod display;
pub mod message;
pub mod sensor;
