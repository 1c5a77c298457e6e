//! Response emission.
//!
//! The [`Emitter`] turns a finished [`ResponseBuilder`] into transport calls
//! in three phases:
//!
//! ```text
//! send()
//!   ├─ send_headers()  header lines + status line (skipped if already sent)
//!   ├─ send_content()  inline body, or the attachment file in chunks
//!   └─ complete()      finish hook, or flush output buffers
//! ```

pub mod buffers;
pub mod transport;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use http::header::HeaderName;
use tracing::{debug, error, warn};

pub use buffers::{BufferFlags, BufferLayer, OutputStream};
pub use transport::{CaptureTransport, Head, Transport, WireTransport};

use crate::config::{HostKind, ResponseConfig, DEFAULT_CHUNK_SIZE};
use crate::core::{message_for_code, Body, ResponseBuilder, Result};

/// How the completion phase ended the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The transport's finish hook ended the request.
    Finished,
    /// Output buffers were flushed down to `level`.
    BuffersClosed { level: usize },
    /// Command-line host; buffers are left alone.
    Skipped,
}

/// Summary of one emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emission {
    /// Whether this emission wrote the head.
    pub headers_written: bool,
    /// Body bytes handed to the transport.
    pub body_bytes: u64,
    pub completion: Completion,
}

/// Writes responses to a [`Transport`].
#[derive(Debug, Clone)]
pub struct Emitter {
    host: HostKind,
    finish_request: bool,
    chunk_size: usize,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            host: HostKind::Server,
            finish_request: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Emitter {
    pub fn new(config: &ResponseConfig) -> Self {
        Self {
            host: config.host,
            finish_request: config.finish_request,
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Emit the whole response.
    pub fn send(&self, res: &ResponseBuilder, transport: &mut dyn Transport) -> Result<Emission> {
        let headers_written = self.send_headers(res, transport)?;
        let body_bytes = self.send_content(res, transport)?;
        let completion = self.complete(transport)?;

        debug!(
            status = res.status_code(),
            headers_written,
            body_bytes,
            ?completion,
            "Response emitted"
        );

        Ok(Emission {
            headers_written,
            body_bytes,
            completion,
        })
    }

    /// Write header lines and the status line.
    ///
    /// Does nothing once the transport reports the head as sent, so calling
    /// it twice has a single effect. Returns whether anything was written.
    pub fn send_headers(&self, res: &ResponseBuilder, transport: &mut dyn Transport) -> Result<bool> {
        if transport.headers_sent() {
            debug!("Headers already sent, skipping header phase");
            return Ok(false);
        }

        let mut seen: Vec<&HeaderName> = Vec::with_capacity(res.header_bag().len());
        for (name, value) in res.header_bag().iter() {
            let replace = !seen.contains(&name);
            transport.send_header(name, value, replace);
            if replace {
                seen.push(name);
            }
        }

        let code = res.status_code();
        transport.send_status(res.http_version(), code, message_for_code(code))?;
        Ok(true)
    }

    /// Write the body. Returns the number of bytes written.
    ///
    /// Attachments stream the file; a file that cannot be opened is logged
    /// and leaves the body empty. The body decides what is written: a
    /// `Content-Disposition` that disagrees with it only logs a warning.
    pub fn send_content(&self, res: &ResponseBuilder, transport: &mut dyn Transport) -> Result<u64> {
        match res.body() {
            Body::File { path, .. } => {
                if !res.is_attachment() {
                    warn!(path = %path.display(), "File body without an attachment disposition");
                }
                self.stream_file(path, transport)
            }
            body => {
                if res.is_attachment() {
                    warn!("Attachment disposition without a file body, sending content inline");
                }
                match body.inline_bytes() {
                    Some(bytes) if !bytes.is_empty() => {
                        transport.write(&bytes)?;
                        Ok(bytes.len() as u64)
                    }
                    _ => Ok(0),
                }
            }
        }
    }

    /// End the request.
    pub fn complete(&self, transport: &mut dyn Transport) -> Result<Completion> {
        if self.finish_request && transport.finish_request()? {
            return Ok(Completion::Finished);
        }

        if self.host == HostKind::Cli {
            return Ok(Completion::Skipped);
        }

        let level = transport.close_output_buffers(0, true)?;
        Ok(Completion::BuffersClosed { level })
    }

    fn stream_file(&self, path: &Path, transport: &mut dyn Transport) -> Result<u64> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open download file");
                return Ok(0);
            }
        };

        let mut chunk = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to read download file");
                    break;
                }
            };
            transport.write(&chunk[..n])?;
            total += n as u64;
        }

        Ok(total)
    }
}
