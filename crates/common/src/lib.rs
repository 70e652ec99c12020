// influxboot-common: credentials and token-listing handling shared by the influxboot CLI

pub mod auth_list;
pub mod credentials;
pub mod env;
pub mod types;
