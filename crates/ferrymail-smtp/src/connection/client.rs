//! Type-state SMTP client.
//!
//! Every step writes one command, reads one (possibly multi-line) reply
//! and requires one exact code. Any failure shuts the transport down and
//! consumes the client, so no further command can be sent.

use super::Transport;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, Credentials, Reply, ReplyCode, SessionState, Step};
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Upper bound on lines in one reply.
const MAX_REPLY_LINES: usize = 128;

/// Type-state marker for connected state (greeting read, EHLO possible).
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// States from which a mail transaction may start.
pub trait ReadyForMail: sealed::Sealed {}
impl ReadyForMail for Connected {}
impl ReadyForMail for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<T, State> {
    transport: T,
    client_id: String,
    state: SessionState,
    _state: PhantomData<State>,
}

impl<T: Transport> Client<T, Connected> {
    /// Creates a client from a transport and reads the server greeting.
    ///
    /// `client_id` is the name announced with EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or its code is not 220.
    pub async fn from_transport(transport: T, client_id: impl Into<String>) -> Result<Self> {
        let mut client = Self {
            transport,
            client_id: client_id.into(),
            state: SessionState::Connected,
            _state: PhantomData,
        };

        let reply = client.read_reply().await;
        client
            .gate(Step::Greeting, ReplyCode::SERVICE_READY, reply)
            .await?;
        client.state = SessionState::GreetingReceived;
        Ok(client)
    }

    /// Sends EHLO. The capability list in the reply is not interpreted.
    ///
    /// # Errors
    ///
    /// Returns an error if the reply code is not 250.
    pub async fn ehlo(mut self) -> Result<Self> {
        let cmd = Command::Ehlo {
            hostname: self.client_id.clone(),
        };
        self.expect(Step::Ehlo, cmd, ReplyCode::OK).await?;
        self.state = SessionState::EhloDone;
        Ok(self)
    }

    /// Upgrades the connection to TLS using STARTTLS, then repeats EHLO.
    ///
    /// `hostname` is the name the server certificate must match. There is
    /// no fallback to plaintext.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is refused, the handshake fails, or
    /// the second EHLO is refused.
    pub async fn starttls(mut self, hostname: &str) -> Result<Self> {
        self.expect(Step::StartTls, Command::StartTls, ReplyCode::SERVICE_READY)
            .await?;

        let upgraded = self.transport.upgrade_to_tls(hostname).await;
        self.check(upgraded).await?;
        self.state = SessionState::TlsUpgraded;
        debug!(hostname, "STARTTLS negotiated");

        let cmd = Command::Ehlo {
            hostname: self.client_id.clone(),
        };
        self.expect(Step::Ehlo, cmd, ReplyCode::OK).await?;
        self.state = SessionState::EhloDoneAgain;
        Ok(self)
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthRejected`] if any of the three replies is not
    /// the expected 334, 334, 235.
    pub async fn auth_login(mut self, credentials: &Credentials) -> Result<Client<T, Authenticated>> {
        self.expect(Step::AuthLogin, Command::AuthLogin, ReplyCode::AUTH_CONTINUE)
            .await?;

        let cmd = Command::AuthResponse {
            encoded: credentials.encoded_username(),
        };
        self.expect(Step::AuthUsername, cmd, ReplyCode::AUTH_CONTINUE)
            .await?;

        let cmd = Command::AuthResponse {
            encoded: credentials.encoded_password(),
        };
        self.expect(Step::AuthPassword, cmd, ReplyCode::AUTH_SUCCESS)
            .await?;

        debug!(username = credentials.username(), "authenticated");
        Ok(self.transition(SessionState::Authenticated))
    }
}

impl<T: Transport, S: ReadyForMail> Client<T, S> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM reply is not 250.
    pub async fn mail_from(mut self, from: &Address) -> Result<Client<T, MailTransaction>> {
        let cmd = Command::MailFrom { from: from.clone() };
        self.expect(Step::MailFrom, cmd, ReplyCode::OK).await?;
        Ok(self.transition(SessionState::MailAccepted))
    }
}

impl<T: Transport> Client<T, MailTransaction> {
    /// Adds the recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO reply is not 250.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<T, RecipientAdded>> {
        let cmd = Command::RcptTo { to: to.clone() };
        self.expect(Step::RcptTo, cmd, ReplyCode::OK).await?;
        Ok(self.transition(SessionState::RecipientAccepted))
    }
}

impl<T: Transport> Client<T, RecipientAdded> {
    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA reply is not 354.
    pub async fn data(mut self) -> Result<Client<T, Data>> {
        self.expect(Step::Data, Command::Data, ReplyCode::START_DATA)
            .await?;
        Ok(self.transition(SessionState::DataAccepted))
    }
}

impl<T: Transport> Client<T, Data> {
    /// Sends the message content and completes the transaction.
    ///
    /// `payload` must already be dot-stuffed and end with `CRLF . CRLF`;
    /// it is written in a single write.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or the reply is not 250.
    pub async fn send_payload(mut self, payload: &[u8]) -> Result<Client<T, Connected>> {
        trace!(bytes = payload.len(), "C: <message payload>");
        let written = self.transport.write_all(payload).await;
        self.check(written).await?;

        let reply = self.read_reply().await;
        self.gate(Step::Payload, ReplyCode::OK, reply).await?;
        Ok(self.transition(SessionState::PayloadSent))
    }
}

// Common implementation for all states
impl<T: Transport, S> Client<T, S> {
    /// Returns the position in the handshake.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// The reply is not read: servers may close the socket straight away,
    /// and nothing that happens after QUIT counts as a failure.
    pub async fn quit(mut self) {
        let cmd = Command::Quit;
        trace!("C: {}", cmd.log_line());
        if let Err(err) = self.transport.write_all(&cmd.serialize()).await {
            debug!(error = %err, "QUIT not delivered");
        }
        self.close().await;
    }

    /// Closes the connection without QUIT.
    pub async fn close(mut self) {
        self.shutdown_quietly().await;
    }

    fn transition<Next>(self, state: SessionState) -> Client<T, Next> {
        Client {
            transport: self.transport,
            client_id: self.client_id,
            state,
            _state: PhantomData,
        }
    }

    async fn expect(&mut self, step: Step, cmd: Command, expected: ReplyCode) -> Result<Reply> {
        trace!(%step, "C: {}", cmd.log_line());
        let written = self.transport.write_all(&cmd.serialize()).await;
        self.check(written).await?;

        let reply = self.read_reply().await;
        self.gate(step, expected, reply).await
    }

    /// Enforces the expected code, shutting down on any failure.
    async fn gate(&mut self, step: Step, expected: ReplyCode, reply: Result<Reply>) -> Result<Reply> {
        let reply = self.check(reply).await?;
        trace!(%step, code = %reply.code, "S: {}", reply.raw_text());

        if reply.code != expected {
            debug!(
                %step,
                %expected,
                actual = %reply.code,
                state = ?self.state,
                "unexpected reply, aborting session"
            );
            self.shutdown_quietly().await;
            return Err(Error::unexpected_reply(
                step,
                expected,
                reply.code,
                reply.raw_text(),
            ));
        }

        Ok(reply)
    }

    async fn check<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            debug!(error = %err, state = ?self.state, "transport failure, aborting session");
            self.shutdown_quietly().await;
        }
        result
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let line = self.transport.read_line().await?;
            let is_last = line.len() < 4 || is_last_reply_line(&line);
            lines.push(line);

            if is_last {
                break;
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(Error::Protocol(format!(
                    "Reply exceeds {MAX_REPLY_LINES} lines"
                )));
            }
        }

        parse_reply(&lines)
    }

    async fn shutdown_quietly(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(err) = self.transport.shutdown().await {
            debug!(error = %err, "error while closing SMTP connection");
        }
        self.state = SessionState::Closed;
    }
}
