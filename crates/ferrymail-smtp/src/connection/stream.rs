//! Low-level SMTP stream handling.

use super::{ConnectionConfig, Connector, Security, Transport};
use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, ServerName};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};
use tracing::debug;

/// Longest reply line accepted from a server.
const MAX_LINE_LENGTH: u64 = 4096;

/// SMTP stream (TCP or TLS) with per-operation timeouts.
#[derive(Debug)]
pub struct SmtpStream {
    inner: Inner,
    timeout: Duration,
    tls: Arc<ClientConfig>,
}

#[derive(Debug)]
enum Inner {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
    /// Shut down, or lost during a failed upgrade.
    Closed,
}

impl SmtpStream {
    /// Returns true if the stream is TLS-encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self.inner, Inner::Tls(_))
    }

    /// Returns true once the stream has been shut down.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.inner, Inner::Closed)
    }
}

impl Transport for SmtpStream {
    async fn read_line(&mut self) -> Result<String> {
        let after = self.timeout;
        let mut line = String::new();
        let read = match &mut self.inner {
            Inner::Tcp(reader) => {
                with_timeout(after, "read", reader.take(MAX_LINE_LENGTH).read_line(&mut line))
                    .await?
            }
            Inner::Tls(reader) => {
                with_timeout(
                    after,
                    "read",
                    reader.as_mut().take(MAX_LINE_LENGTH).read_line(&mut line),
                )
                .await?
            }
            Inner::Closed => return Err(Error::ConnectionClosed),
        };

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        if !line.ends_with('\n') && read as u64 >= MAX_LINE_LENGTH {
            return Err(Error::Protocol(format!(
                "Reply line exceeds {MAX_LINE_LENGTH} bytes"
            )));
        }
        Ok(line)
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let after = self.timeout;
        match &mut self.inner {
            Inner::Tcp(reader) => {
                let stream = reader.get_mut();
                with_timeout(after, "write", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
            Inner::Tls(reader) => {
                let stream = reader.get_mut();
                with_timeout(after, "write", async {
                    stream.write_all(data).await?;
                    stream.flush().await
                })
                .await
            }
            Inner::Closed => Err(Error::ConnectionClosed),
        }
    }

    /// Upgrades the open TCP connection to TLS in place.
    ///
    /// The same socket carries the TLS session. Plaintext the server sent
    /// after its STARTTLS reply is treated as an attack and fails the upgrade.
    async fn upgrade_to_tls(&mut self, hostname: &str) -> Result<()> {
        let reader = match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Tcp(reader) => reader,
            other => {
                self.inner = other;
                return Err(Error::Protocol("STARTTLS requires a plaintext stream".into()));
            }
        };

        if !reader.buffer().is_empty() {
            return Err(Error::Tls {
                host: hostname.to_string(),
                reason: "server sent data before the TLS handshake".into(),
            });
        }

        let tls_stream =
            tls_handshake(&self.tls, hostname, reader.into_inner(), self.timeout).await?;
        self.inner = Inner::Tls(Box::new(BufReader::new(tls_stream)));
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        let after = self.timeout;
        match std::mem::replace(&mut self.inner, Inner::Closed) {
            Inner::Tcp(mut reader) => {
                with_timeout(after, "shutdown", reader.get_mut().shutdown()).await
            }
            Inner::Tls(mut reader) => {
                with_timeout(after, "shutdown", reader.get_mut().shutdown()).await
            }
            Inner::Closed => Ok(()),
        }
    }
}

/// Opens plain TCP connections, wrapped in TLS for [`Security::Tls`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = SmtpStream;

    async fn connect(&self, config: &ConnectionConfig) -> Result<SmtpStream> {
        connect(config).await
    }
}

/// Connects to an SMTP server.
///
/// The configured timeout bounds name resolution plus connection
/// establishment, the implicit TLS handshake, and every later read and
/// write on the returned stream. The TLS settings built here are reused
/// by a later STARTTLS upgrade.
///
/// # Errors
///
/// Returns [`Error::Connect`] if the socket cannot be opened in time and
/// [`Error::Tls`] if a configured root certificate is unusable or implicit
/// TLS cannot be negotiated.
pub async fn connect(config: &ConnectionConfig) -> Result<SmtpStream> {
    let tls = create_tls_config(&config.host, &config.root_certificates)?;
    let connect_error = |source: io::Error| Error::Connect {
        host: config.host.clone(),
        port: config.port,
        source,
    };

    let tcp_stream = match timeout(
        config.timeout,
        TcpStream::connect((config.host.as_str(), config.port)),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(connect_error(source)),
        Err(_) => {
            return Err(connect_error(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", config.timeout),
            )));
        }
    };

    debug!(host = %config.host, port = config.port, security = %config.security, "SMTP socket connected");

    let inner = match config.security {
        Security::Tls => {
            let tls_stream = tls_handshake(&tls, &config.host, tcp_stream, config.timeout).await?;
            Inner::Tls(Box::new(BufReader::new(tls_stream)))
        }
        Security::None | Security::StartTls => Inner::Tcp(BufReader::new(tcp_stream)),
    };

    Ok(SmtpStream {
        inner,
        timeout: config.timeout,
        tls,
    })
}

/// Negotiates TLS 1.2 or 1.3 as client, verifying the certificate
/// against `hostname`.
async fn tls_handshake(
    tls: &Arc<ClientConfig>,
    hostname: &str,
    tcp_stream: TcpStream,
    after: Duration,
) -> Result<TlsStream<TcpStream>> {
    let tls_error = |reason: String| Error::Tls {
        host: hostname.to_string(),
        reason,
    };

    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| tls_error(format!("invalid server name: {hostname}")))?;

    let connector = TlsConnector::from(Arc::clone(tls));
    match timeout(after, connector.connect(server_name, tcp_stream)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(err)) => Err(tls_error(err.to_string())),
        Err(_) => Err(tls_error(format!("handshake timed out after {after:?}"))),
    }
}

/// Creates a TLS client configuration trusting the Mozilla root
/// certificates plus `extra_roots`.
fn create_tls_config(
    host: &str,
    extra_roots: &[CertificateDer<'static>],
) -> Result<Arc<ClientConfig>> {
    let mut root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    for cert in extra_roots {
        root_store.add(cert.clone()).map_err(|err| Error::Tls {
            host: host.to_string(),
            reason: format!("unusable root certificate: {err}"),
        })?;
    }

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

async fn with_timeout<T>(
    after: Duration,
    operation: &'static str,
    future: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match timeout(after, future).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Timeout { operation, after }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use tokio::io::{AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    /// Self-signed certificate for `localhost` and a server acceptor using it.
    fn self_signed() -> (CertificateDer<'static>, TlsAcceptor) {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let der = CertificateDer::from(cert.serialize_der().unwrap());
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));

        let config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![der.clone()], key)
            .unwrap();
        (der, TlsAcceptor::from(Arc::new(config)))
    }

    fn tls_config(
        host: &str,
        port: u16,
        security: Security,
        root: Option<CertificateDer<'static>>,
    ) -> ConnectionConfig {
        let mut builder = ConnectionConfig::builder(host)
            .port(port)
            .security(security)
            .timeout(Duration::from_secs(5));
        if let Some(root) = root {
            builder = builder.add_root_certificate(root);
        }
        builder.build()
    }

    async fn local_pair(timeout: Duration) -> (SmtpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = ConnectionConfig::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .timeout(timeout)
            .build();
        let (client, server) = tokio::join!(connect(&config), listener.accept());
        (client.unwrap(), server.unwrap().0)
    }

    #[tokio::test]
    async fn test_read_line_keeps_terminator() {
        let (mut stream, mut server) = local_pair(Duration::from_secs(5)).await;
        server.write_all(b"250-first\r\n250 last\r\n").await.unwrap();

        assert_eq!(stream.read_line().await.unwrap(), "250-first\r\n");
        assert_eq!(stream.read_line().await.unwrap(), "250 last\r\n");
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn test_read_line_eof() {
        let (mut stream, server) = local_pair(Duration::from_secs(5)).await;
        drop(server);
        assert!(matches!(
            stream.read_line().await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (mut stream, _server) = local_pair(Duration::from_millis(100)).await;
        assert!(matches!(
            stream.read_line().await,
            Err(Error::Timeout {
                operation: "read",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes() {
        let (mut stream, _server) = local_pair(Duration::from_secs(5)).await;
        stream.shutdown().await.unwrap();
        assert!(stream.is_closed());
        assert!(matches!(
            stream.write_all(b"QUIT\r\n").await,
            Err(Error::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_upgrade_rejects_buffered_plaintext() {
        let (mut stream, mut server) = local_pair(Duration::from_secs(5)).await;
        server
            .write_all(b"220 go ahead\r\n250 injected\r\n")
            .await
            .unwrap();
        stream.read_line().await.unwrap();

        let err = stream.upgrade_to_tls("localhost").await.unwrap_err();
        assert!(matches!(err, Error::Tls { .. }));
        assert!(stream.is_closed());
    }

    #[tokio::test]
    async fn test_implicit_tls_connect() {
        let (cert, acceptor) = self_signed();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut tls = acceptor.accept(tcp).await.unwrap();
            tls.write_all(b"220 secure greeting\r\n").await.unwrap();
            tls.flush().await.unwrap();
            let mut buf = [0u8; 1];
            let _ = tls.read(&mut buf).await;
        });

        let config = tls_config("localhost", port, Security::Tls, Some(cert));
        let mut stream = connect(&config).await.unwrap();
        assert!(stream.is_tls());
        assert_eq!(stream.read_line().await.unwrap(), "220 secure greeting\r\n");

        stream.shutdown().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_starttls_upgrade_reuses_socket() {
        let (cert, acceptor) = self_signed();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            tcp.write_all(b"220 ready for TLS\r\n").await.unwrap();

            let tls = acceptor.accept(tcp).await.unwrap();
            let mut tls = tokio::io::BufReader::new(tls);
            let mut line = String::new();
            tls.read_line(&mut line).await.unwrap();
            tls.get_mut()
                .write_all(format!("250 got {line}").as_bytes())
                .await
                .unwrap();
            tls.get_mut().flush().await.unwrap();

            let second = tokio::time::timeout(Duration::from_millis(200), listener.accept()).await;
            (line, second.is_err())
        });

        let config = tls_config("localhost", port, Security::StartTls, Some(cert));
        let mut stream = connect(&config).await.unwrap();
        assert!(!stream.is_tls());
        assert_eq!(stream.read_line().await.unwrap(), "220 ready for TLS\r\n");

        stream.upgrade_to_tls("localhost").await.unwrap();
        assert!(stream.is_tls());
        stream.write_all(b"EHLO client.test\r\n").await.unwrap();
        assert_eq!(
            stream.read_line().await.unwrap(),
            "250 got EHLO client.test\r\n"
        );

        let (seen, single_accept) = server.await.unwrap();
        assert_eq!(seen, "EHLO client.test\r\n");
        assert!(single_accept);
    }

    #[tokio::test]
    async fn test_untrusted_certificate_rejected() {
        let (_cert, acceptor) = self_signed();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ = acceptor.accept(tcp).await;
        });

        let config = tls_config("localhost", port, Security::Tls, None);
        let err = connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Tls { ref host, .. } if host == "localhost"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_certificate_must_match_host() {
        let (cert, acceptor) = self_signed();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let _ = acceptor.accept(tcp).await;
        });

        // Trusted root, but issued for `localhost` rather than the IP.
        let config = tls_config("127.0.0.1", port, Security::Tls, Some(cert));
        let err = connect(&config).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TlsHandshakeFailure);
        server.await.unwrap();
    }

    #[test]
    fn test_unusable_root_certificate() {
        let err = create_tls_config("localhost", &[CertificateDer::from(vec![0u8; 8])]).unwrap_err();
        assert!(matches!(err, Error::Tls { .. }));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ConnectionConfig::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .timeout(Duration::from_secs(2))
            .build();
        match connect(&config).await {
            Err(Error::Connect { host, port: p, .. }) => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }
}
