pub mod aggregate;
pub mod config;
pub mod context;
pub mod error;
pub mod feed;
pub mod http_cache;
pub mod http_client;
pub mod model;
pub mod phases;
pub mod report;
pub mod run;
pub mod snapshot_store;
pub mod squads;
pub mod standings;
