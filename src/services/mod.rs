pub mod feeds_api;
