//! One-shot delivery of a single message.

use super::Transport;
use super::client::{Client, ReadyForMail};
use super::config::Security;
use crate::error::Result;
use crate::types::{Address, Credentials};
use tracing::debug;

/// Handshake parameters for [`deliver`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name announced with EHLO.
    pub client_id: String,
    /// Security mode. Only [`Security::StartTls`] changes the handshake;
    /// implicit TLS is negotiated by the connector.
    pub security: Security,
    /// Name the certificate must match after STARTTLS.
    pub server_name: String,
    /// AUTH LOGIN credentials. `None` skips authentication.
    pub credentials: Option<Credentials>,
}

/// Runs the full send sequence for one message over `transport`.
///
/// Greeting, EHLO, optional STARTTLS with a second EHLO, optional AUTH
/// LOGIN, MAIL FROM, RCPT TO, DATA, payload, then QUIT. Each step must
/// receive its exact expected code. On the first failure no further
/// command is sent and the transport is closed.
///
/// `payload` must be the dot-stuffed message ending with `CRLF . CRLF`.
///
/// # Errors
///
/// Returns the error of the first step that failed. Nothing after the
/// payload is accepted can fail the delivery.
pub async fn deliver<T: Transport>(
    transport: T,
    config: &SessionConfig,
    from: &Address,
    to: &Address,
    payload: &[u8],
) -> Result<()> {
    let client = Client::from_transport(transport, config.client_id.clone()).await?;
    let client = client.ehlo().await?;

    let client = if config.security == Security::StartTls {
        client.starttls(&config.server_name).await?
    } else {
        client
    };

    if let Some(credentials) = &config.credentials {
        let client = client.auth_login(credentials).await?;
        transact(client, from, to, payload).await
    } else {
        transact(client, from, to, payload).await
    }
}

async fn transact<T: Transport, S: ReadyForMail>(
    client: Client<T, S>,
    from: &Address,
    to: &Address,
    payload: &[u8],
) -> Result<()> {
    let client = client.mail_from(from).await?;
    let client = client.rcpt_to(to).await?;
    let client = client.data().await?;
    let client = client.send_payload(payload).await?;

    debug!(%from, %to, bytes = payload.len(), "message accepted");
    client.quit().await;
    Ok(())
}
