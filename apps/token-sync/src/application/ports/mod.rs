//! Port Interfaces
//!
//! Interfaces the synchronizer depends on. The REST adapter in
//! `infrastructure::api` is the production implementation; tests substitute
//! mocks.

use async_trait::async_trait;

use crate::domain::token::TokenList;
use crate::infrastructure::api::ApiError;

/// Source of full token collection snapshots.
///
/// The stream tells the synchronizer *that* the collection changed; this
/// port supplies *what* it changed to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenSourcePort: Send + Sync {
    /// Fetch every token currently known to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be
    /// decoded.
    async fn fetch_tokens(&self) -> Result<TokenList, ApiError>;
}
