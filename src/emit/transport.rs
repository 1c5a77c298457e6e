//! Where emitted responses go.
//!
//! A [`Transport`] is the low-level sink the emitter talks to: it accepts
//! header lines and a status line until the head is committed, then body
//! bytes. Once any body byte reaches the client the head is committed and
//! later header calls are ignored.

use std::io::{self, Write};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http_body_util::Full;

use super::buffers::{BufferFlags, OutputStream};
use crate::core::{HeaderBag, Result};

/// Low-level response sink.
pub trait Transport {
    /// Whether the head has been committed to the client.
    fn headers_sent(&self) -> bool;

    /// Record a header line. `replace` drops earlier lines of the same name.
    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue, replace: bool);

    /// Record the status line and commit the head.
    fn send_status(&mut self, version: &str, code: u16, reason: &str) -> io::Result<()>;

    /// Write body bytes.
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush everything and end the client's request early.
    ///
    /// Returns false when the transport has no such hook.
    fn finish_request(&mut self) -> io::Result<bool> {
        Ok(false)
    }

    /// Flush removable output buffers down to `target_level`.
    ///
    /// Returns the resulting level.
    fn close_output_buffers(&mut self, target_level: usize, flush: bool) -> io::Result<usize> {
        let _ = (target_level, flush);
        Ok(0)
    }

    /// Active output buffer level.
    fn buffer_level(&self) -> usize {
        0
    }
}

/// Status line and header lines of a response.
#[derive(Debug, Clone)]
pub struct Head {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderBag,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            version: "HTTP/1.1".to_string(),
            status: 200,
            reason: "OK".to_string(),
            headers: HeaderBag::new(),
        }
    }
}

impl Head {
    /// Write the head in wire format, including the blank line.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{} {} {}\r\n", self.version, self.status, self.reason)?;
        for (name, value) in self.headers.iter() {
            out.write_all(name.as_str().as_bytes())?;
            out.write_all(b": ")?;
            out.write_all(value.as_bytes())?;
            out.write_all(b"\r\n")?;
        }
        out.write_all(b"\r\n")
    }
}

/// Transport that keeps the whole response in memory.
///
/// Body bytes pass through an [`OutputStream`], so handlers and tests can
/// open buffer layers in front of the captured body. With the finish hook
/// enabled, [`finish_request`](Transport::finish_request) flushes every layer
/// and later output is discarded.
#[derive(Debug)]
pub struct CaptureTransport {
    head: Head,
    status_sent: bool,
    commits: usize,
    output: OutputStream<Vec<u8>>,
    finish_hook: bool,
    finished: bool,
}

impl Default for CaptureTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureTransport {
    /// Capture transport without a finish-request hook.
    pub fn new() -> Self {
        Self {
            head: Head::default(),
            status_sent: false,
            commits: 0,
            output: OutputStream::new(Vec::new()),
            finish_hook: false,
            finished: false,
        }
    }

    /// Capture transport with a finish-request hook.
    pub fn with_finish_hook() -> Self {
        Self {
            finish_hook: true,
            ..Self::new()
        }
    }

    /// Open an output buffer layer in front of the body.
    pub fn start_buffer(&mut self, name: &str, flags: BufferFlags) -> usize {
        self.output.start(name, flags)
    }

    /// Buffer stack in front of the body.
    #[inline]
    pub fn output(&mut self) -> &mut OutputStream<Vec<u8>> {
        &mut self.output
    }

    #[inline]
    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Bytes that reached the client.
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.output.sink()
    }

    /// Number of status lines committed.
    #[inline]
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Whether the finish hook has run.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Convert into a hyper response.
    ///
    /// Buffered output still pending is flushed first.
    pub fn into_http_response(mut self) -> Result<http::Response<Full<Bytes>>> {
        self.output.flush_all()?;

        let mut builder = http::Response::builder().status(self.head.status);
        for (name, value) in self.head.headers.iter() {
            builder = builder.header(name, value);
        }

        let body = Bytes::from(self.output.into_sink());
        Ok(builder.body(Full::new(body))?)
    }

    fn commit(&mut self) {
        self.status_sent = true;
        self.commits += 1;
    }
}

impl Transport for CaptureTransport {
    fn headers_sent(&self) -> bool {
        self.status_sent || !self.output.sink().is_empty()
    }

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue, replace: bool) {
        if self.headers_sent() {
            tracing::warn!(header = name.as_str(), "Headers already sent, header ignored");
            return;
        }
        self.head.headers.set(name.clone(), value.clone(), replace);
    }

    fn send_status(&mut self, version: &str, code: u16, reason: &str) -> io::Result<()> {
        if self.headers_sent() {
            tracing::warn!(status = code, "Headers already sent, status line ignored");
            return Ok(());
        }
        self.head.version = version.to_string();
        self.head.status = code;
        self.head.reason = reason.to_string();
        self.commit();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.finished {
            // Request already finished, output goes nowhere
            return Ok(());
        }
        self.output.write_all(data)
    }

    fn finish_request(&mut self) -> io::Result<bool> {
        if !self.finish_hook {
            return Ok(false);
        }
        if self.finished {
            return Ok(true);
        }

        self.output.flush_all()?;
        if !self.status_sent {
            self.commit();
        }
        self.finished = true;
        Ok(true)
    }

    fn close_output_buffers(&mut self, target_level: usize, flush: bool) -> io::Result<usize> {
        self.output.close_output_buffers(target_level, flush)
    }

    fn buffer_level(&self) -> usize {
        self.output.level()
    }
}

/// Sink that writes the head in front of the first body byte.
#[derive(Debug)]
struct Wire<W> {
    inner: W,
    head: Head,
    head_sent: bool,
}

impl<W: Write> Wire<W> {
    fn commit(&mut self) -> io::Result<()> {
        if !self.head_sent {
            self.head.write_to(&mut self.inner)?;
            self.head_sent = true;
        }
        Ok(())
    }
}

impl<W: Write> Write for Wire<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.commit()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Transport that writes raw HTTP/1.x text to any writer.
///
/// The head is written when the status line is sent or when the first body
/// byte reaches the writer, whichever comes first.
#[derive(Debug)]
pub struct WireTransport<W: Write> {
    output: OutputStream<Wire<W>>,
}

impl<W: Write> WireTransport<W> {
    pub fn new(inner: W) -> Self {
        Self {
            output: OutputStream::new(Wire {
                inner,
                head: Head::default(),
                head_sent: false,
            }),
        }
    }

    /// Open an output buffer layer in front of the writer.
    pub fn start_buffer(&mut self, name: &str, flags: BufferFlags) -> usize {
        self.output.start(name, flags)
    }

    /// Flush pending output and return the writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.output.flush_all()?;
        let mut wire = self.output.into_sink();
        wire.commit()?;
        Ok(wire.inner)
    }
}

impl<W: Write> Transport for WireTransport<W> {
    fn headers_sent(&self) -> bool {
        self.output.sink().head_sent
    }

    fn send_header(&mut self, name: &HeaderName, value: &HeaderValue, replace: bool) {
        if self.headers_sent() {
            tracing::warn!(header = name.as_str(), "Headers already sent, header ignored");
            return;
        }
        self.output
            .sink_mut()
            .head
            .headers
            .set(name.clone(), value.clone(), replace);
    }

    fn send_status(&mut self, version: &str, code: u16, reason: &str) -> io::Result<()> {
        if self.headers_sent() {
            tracing::warn!(status = code, "Headers already sent, status line ignored");
            return Ok(());
        }
        let wire = self.output.sink_mut();
        wire.head.version = version.to_string();
        wire.head.status = code;
        wire.head.reason = reason.to_string();
        wire.commit()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.output.write_all(data)
    }

    fn close_output_buffers(&mut self, target_level: usize, flush: bool) -> io::Result<usize> {
        self.output.close_output_buffers(target_level, flush)
    }

    fn buffer_level(&self) -> usize {
        self.output.level()
    }
}
