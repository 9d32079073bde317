pub mod config;
pub mod gameweek;
pub mod http_client;
pub mod model;
pub mod points;
pub mod prizes;
pub mod resolver;
pub mod schedule;
pub mod season;
pub mod standings;
pub mod store;
