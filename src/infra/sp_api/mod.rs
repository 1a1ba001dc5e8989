//! Selling Partner API client: token exchange, Feeds operations and feed
//! document transfer.

mod client;
mod documents;

pub use client::{LWA_TOKEN_URL, SellingPartnerClient};
pub use documents::SubmitFeedOptions;
