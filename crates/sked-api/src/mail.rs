//! Mail collaborators

use async_trait::async_trait;
use sked_core::{MailError, Mailer};
use tracing::info;

/// Mailer that writes activation links to the log instead of sending them
///
/// Default for development and tests; plug a relay-backed `Mailer` in
/// production.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_activation_mail(
        &self,
        to_address: &str,
        activation_url: &str,
    ) -> Result<(), MailError> {
        if !to_address.contains('@') {
            return Err(MailError::InvalidRecipient(to_address.to_string()));
        }

        info!(
            to = %to_address,
            activation_url = %activation_url,
            "Activation mail"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
