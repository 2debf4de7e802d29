pub mod model;
pub mod mqtt;
