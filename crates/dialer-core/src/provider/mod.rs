//! Call provider seam.
//!
//! The dispatcher only knows `CallProvider`; production wiring passes an
//! `HttpCallProvider`, tests pass scripted doubles.

mod http;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::DialerError;

pub use http::HttpCallProvider;

/// One outbound dial request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub assistant_id: String,
    /// Outbound line (provider phone-number id) the call originates from.
    pub line_id: String,
    pub customer_number: String,
    pub customer_name: String,
    /// Template variables substituted into the assistant's prompts.
    pub variables: BTreeMap<String, String>,
}

#[async_trait]
pub trait CallProvider: Send + Sync {
    /// Place the call; returns the provider's call id.
    async fn create_call(&self, request: &CallRequest) -> Result<String, DialerError>;
}
