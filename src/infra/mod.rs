pub mod sp_api;
