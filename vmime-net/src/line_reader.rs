//! Line-oriented reads/writes shared by the SMTP/IMAP/POP3 connections, each
//! read bounded by a deadline so a silent peer can't hang a caller forever
//! (spec §4.L).

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};

use crate::error::{NetError, NetResult};

/// Observes the wire-level conversation. The default implementation logs
/// through `tracing`; a caller wanting a different sink (a UI transcript
/// pane, a test spy recording lines) can supply its own.
pub trait Tracer: Send + Sync + std::fmt::Debug {
    fn sent(&self, line: &[u8]) {
        tracing::trace!(target: "vmime_net", "C: {}", String::from_utf8_lossy(line));
    }

    fn received(&self, line: &[u8]) {
        tracing::trace!(target: "vmime_net", "S: {}", String::from_utf8_lossy(line));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

impl Tracer for TracingTracer {}

/// A buffered line reader/writer over any `AsyncRead + AsyncWrite` socket,
/// with a per-read timeout (spec §4.L `LineReader`).
#[derive(Debug)]
pub struct LineReader<S> {
    inner: BufStream<S>,
    read_timeout: Duration,
    tracer: Box<dyn Tracer>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> LineReader<S> {
    pub fn new(socket: S, read_timeout: Duration) -> Self {
        Self {
            inner: BufStream::new(socket),
            read_timeout,
            tracer: Box::new(TracingTracer),
        }
    }

    pub fn with_tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Box::new(tracer);
        self
    }

    /// Reads one CRLF- or LF-terminated line, with the line ending
    /// stripped. Errors with [`NetError::Timeout`] if nothing arrives
    /// within `read_timeout`, and with [`NetError::ConnectionClosed`] on
    /// EOF.
    pub async fn read_line(&mut self) -> NetResult<Vec<u8>> {
        let mut line = Vec::new();
        let n = tokio::time::timeout(self.read_timeout, self.inner.read_until(b'\n', &mut line))
            .await
            .map_err(|_| NetError::Timeout)??;
        if n == 0 {
            return Err(NetError::ConnectionClosed);
        }
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }
        self.tracer.received(&line);
        Ok(line)
    }

    /// Writes one line, appending a CRLF and flushing.
    pub async fn write_line(&mut self, line: &[u8]) -> NetResult<()> {
        self.tracer.sent(line);
        self.inner.write_all(line).await?;
        self.inner.write_all(b"\r\n").await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Writes raw bytes verbatim (no line ending appended), flushing
    /// immediately. Used for `DATA`/`BDAT` payloads and IMAP literals.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> NetResult<()> {
        self.inner.write_all(bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Unwraps the reader, handing back the underlying socket (used to
    /// perform the `STARTTLS`/`STLS` handshake in place). Assumes no bytes
    /// beyond the last line read are sitting in the internal buffer, which
    /// holds as long as the caller reads the `STARTTLS` reply before the
    /// peer sends anything further.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    pub fn get_mut(&mut self) -> &mut S {
        self.inner.get_mut()
    }
}
