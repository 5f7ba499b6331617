pub mod admin;
pub mod backend;
pub mod calendar;
pub mod compactor;
pub mod config;
pub mod desk;
pub mod engine;
pub mod limits;
pub mod model;
pub mod observability;
pub mod profile;
pub mod search;
pub mod sql;
pub mod store;
pub mod time;
pub mod tls;
pub mod wal;
pub mod wire;
pub mod workflow;
