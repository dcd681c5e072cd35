//! The mailer facade.

use crate::config::TransportConfig;
use crate::error::{MailError, Result};
use crate::logging::{Level, LogEntry, LogSink, TracingSink};
use crate::template::{TemplateError, TemplateRenderer};
use ferrymail_mime::OutboundMessage;
use ferrymail_smtp::{Address, Connector, SessionConfig, TcpConnector, deliver};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Per-send overrides.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Sender address instead of the configured one.
    pub from_address: Option<String>,
    /// Sender display name instead of the configured one.
    pub from_name: Option<String>,
    /// Extra headers. A name that matches a standard header replaces it.
    pub headers: Vec<(String, String)>,
}

impl SendOptions {
    /// Overrides the sender.
    #[must_use]
    pub fn from(mut self, address: impl Into<String>, name: impl Into<String>) -> Self {
        self.from_address = Some(address.into());
        self.from_name = Some(name.into());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Sends single emails and reports the outcome as a boolean.
///
/// Every call opens its own connection, runs one SMTP session and closes
/// the connection before returning. Calls share nothing but the log sink,
/// so one `Mailer` can serve concurrent sends.
///
/// ```ignore
/// use ferrymail::{Mailer, SendOptions, TransportConfig};
///
/// let mailer = Mailer::new(TransportConfig::from_env()?);
/// let sent = mailer
///     .send("user@example.org", "Welcome", "<p>Hello!</p>", SendOptions::default())
///     .await;
/// ```
pub struct Mailer<C = TcpConnector> {
    config: TransportConfig,
    connector: C,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    sink: Arc<dyn LogSink>,
}

impl Mailer<TcpConnector> {
    /// Creates a mailer that connects over TCP and logs through `tracing`.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            connector: TcpConnector,
            renderer: None,
            sink: Arc::new(TracingSink),
        }
    }
}

impl<C: Connector> Mailer<C> {
    /// Replaces the connector.
    #[must_use]
    pub fn with_connector<D: Connector>(self, connector: D) -> Mailer<D> {
        Mailer {
            config: self.config,
            connector,
            renderer: self.renderer,
            sink: self.sink,
        }
    }

    /// Sets the template renderer used by [`Mailer::send_template`].
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Sets the log sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Sends one email.
    ///
    /// Returns `true` once the server has accepted the message. Any failure
    /// is logged on the `mail` channel and reported as `false`.
    pub async fn send(&self, to: &str, subject: &str, body: &str, options: SendOptions) -> bool {
        match self.try_send(to, subject, body, options).await {
            Ok(()) => {
                self.sink.record(
                    LogEntry::mail(Level::Info, "Email sent")
                        .with("to", to)
                        .with("subject", subject),
                );
                true
            }
            Err(err) => {
                self.sink.record(failure_entry(&err, to, subject));
                false
            }
        }
    }

    /// Renders `template` with `data` and sends the result.
    ///
    /// An unknown template is logged and reported as `false` without
    /// connecting.
    pub async fn send_template(&self, to: &str, subject: &str, template: &str, data: &Value) -> bool {
        match self.render(template, data) {
            Ok(body) => self.send(to, subject, &body, SendOptions::default()).await,
            Err(err) => {
                let entry = if matches!(err, MailError::TemplateNotFound { .. }) {
                    LogEntry::mail(Level::Error, "Email template not found")
                        .with("template", template)
                } else {
                    failure_entry(&err, to, subject).with("template", template)
                };
                self.sink.record(entry);
                false
            }
        }
    }

    /// Sends one email and returns the typed outcome without logging.
    ///
    /// # Errors
    ///
    /// Returns the composition, connection or session failure that stopped
    /// the send.
    pub async fn try_send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        options: SendOptions,
    ) -> Result<()> {
        let from_address = options
            .from_address
            .unwrap_or_else(|| self.config.from_address.clone());
        let from_name = options
            .from_name
            .unwrap_or_else(|| self.config.from_name.clone());

        let message = options
            .headers
            .into_iter()
            .fold(
                OutboundMessage::builder()
                    .from(from_address, from_name)
                    .to(to)
                    .subject(subject)
                    .body(body),
                |builder, (name, value)| builder.header(name, value),
            )
            .build()?;

        let from = Address::new(message.from_address())?;
        let rcpt = Address::new(message.to())?;
        let payload = message.payload();

        let connection = self.config.connection_config();
        debug!(
            host = %connection.host,
            port = connection.port,
            security = %connection.security,
            to,
            "sending email"
        );
        let stream = self.connector.connect(&connection).await?;

        let session = SessionConfig {
            client_id: self.config.client_id(),
            security: connection.security,
            server_name: connection.host,
            credentials: self.config.credentials(),
        };
        deliver(stream, &session, &from, &rcpt, payload.as_bytes()).await?;
        Ok(())
    }

    fn render(&self, template: &str, data: &Value) -> Result<String> {
        let Some(renderer) = &self.renderer else {
            return Err(MailError::TemplateNotFound {
                name: template.to_string(),
            });
        };

        renderer.render(template, data).map_err(|err| match err {
            TemplateError::NotFound(name) => MailError::TemplateNotFound { name },
            other => MailError::Template {
                name: template.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

fn failure_entry(err: &MailError, to: &str, subject: &str) -> LogEntry {
    let message = match err {
        MailError::Smtp(ferrymail_smtp::Error::Connect { .. }) => "SMTP connection failed",
        MailError::Smtp(smtp) if smtp.reply_mismatch().is_some() => "Unexpected SMTP response",
        _ => "Email failed",
    };

    let mut entry = LogEntry::mail(Level::Error, message)
        .with("to", to)
        .with("subject", subject)
        .with("error", err.to_string())
        .with("kind", err.kind());

    if let MailError::Smtp(smtp) = err {
        match smtp {
            ferrymail_smtp::Error::Connect { host, port, .. } => {
                entry = entry.with("host", host.as_str()).with("port", *port);
            }
            ferrymail_smtp::Error::Tls { host, .. } => {
                entry = entry.with("host", host.as_str());
            }
            ferrymail_smtp::Error::UnexpectedReply {
                step,
                expected,
                actual,
                response,
            }
            | ferrymail_smtp::Error::AuthRejected {
                step,
                expected,
                actual,
                response,
            } => {
                entry = entry
                    .with("step", step.as_str())
                    .with("expected", expected.as_u16())
                    .with("actual", actual.as_u16())
                    .with("response", response.as_str());
            }
            _ => {}
        }
    }

    entry
}
