//! A plain-or-TLS byte stream, so the SMTP/IMAP/POP3 connections can be
//! written once against `AsyncRead + AsyncWrite` and upgraded in place on
//! `STARTTLS`/`STLS` (spec §4.L).

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::error::{NetError, NetResult};

#[cfg(feature = "tls")]
use std::sync::Arc;

/// Either a raw TCP connection or one wrapped in TLS, used interchangeably
/// by every protocol connection in this crate.
#[derive(Debug)]
pub enum Socket {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Socket {
    pub async fn connect_plain(host: &str, port: u16) -> NetResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Socket::Plain(stream))
    }

    #[cfg(feature = "tls")]
    pub async fn connect_tls(host: &str, port: u16) -> NetResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Self::upgrade(stream, host).await
    }

    /// Upgrades an already-connected plain socket to TLS in place, the way
    /// `STARTTLS`/`STLS` requires: the handshake reuses the same TCP
    /// connection rather than opening a new one.
    #[cfg(feature = "tls")]
    pub async fn starttls(self, host: &str) -> NetResult<Self> {
        match self {
            Socket::Plain(stream) => Self::upgrade(stream, host).await,
            already_tls @ Socket::Tls(_) => Ok(already_tls),
        }
    }

    #[cfg(feature = "tls")]
    async fn upgrade(stream: TcpStream, host: &str) -> NetResult<Self> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
        let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| NetError::Tls(e.to_string()))?;
        let tls = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| NetError::Tls(e.to_string()))?;
        Ok(Socket::Tls(Box::new(tls)))
    }

    pub fn is_encrypted(&self) -> bool {
        match self {
            Socket::Plain(_) => false,
            #[cfg(feature = "tls")]
            Socket::Tls(_) => true,
        }
    }
}

impl AsyncRead for Socket {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Socket {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Socket::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Socket::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
