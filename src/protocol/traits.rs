use async_trait::async_trait;

use crate::args::Protocol;
use crate::error::ProtocolError;

use super::outcome::OutcomeRecord;
use super::session::{RequestOptions, SessionHandle};

/// Transport seam between scenarios and the network.
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Opens the per-user transport session.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying client cannot be configured.
    async fn create_session(&self, user_id: u64) -> Result<SessionHandle, ProtocolError>;

    /// Issues one logical request. Ordinary failures are encoded on the
    /// returned record rather than raised.
    async fn request(
        &self,
        session: &mut SessionHandle,
        url: &str,
        user_id: u64,
        options: &RequestOptions,
    ) -> OutcomeRecord;

    async fn close_session(&self, session: SessionHandle) {
        drop(session);
    }
}
