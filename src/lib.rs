pub mod config;
pub mod fetch;
pub mod gtfs_rt;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod stats;
pub mod validate;
pub mod vehicle;
pub mod wire;
