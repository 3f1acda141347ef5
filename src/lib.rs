pub mod config;
pub mod highlight;
pub mod matcher;
pub mod model;
pub mod results;
pub mod session;
pub mod sources;
