pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;
pub mod store;
pub mod view_model;
