//! Billing data retrieval from Azure Cost Management.

pub mod query;
pub mod token;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::detect::series::CostRecord;

pub use self::query::CostManagementClient;
pub use self::token::TokenProvider;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("cannot get access token for Cost Management API ({status}): {body}")]
    Token { status: u16, body: String },

    #[error("billing request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("cost query returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed cost query response: {0}")]
    MalformedResponse(String),
}

/// Source of daily cost records grouped by resource type.
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Fetch every daily record between `from` and `to`, both inclusive,
    /// draining all result pages.
    async fn fetch_costs(
        &self,
        subscription_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CostRecord>, BillingError>;
}
