//! Selling Partner API Feeds client with layered credential resolution.

pub mod credentials;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod marketplaces;
pub mod services;

pub use credentials::{CredentialResolver, Credentials, MissingCredentials};
pub use error::ApiError;
pub use infra::sp_api::{SellingPartnerClient, SubmitFeedOptions};
pub use marketplaces::{Marketplace, Region};
pub use services::feeds_api::FeedsApi;
