//! Nested output buffering.
//!
//! Body bytes pass through a stack of buffer layers before they reach the
//! sink. Writes land in the innermost layer; closing a layer either flushes
//! its bytes into the layer below (or the sink) or discards them.
//!
//! ```text
//! write() ──> [layer 2] ──flush──> [layer 1] ──flush──> [layer 0] ──flush──> sink
//! ```

use std::io::{self, Write};

use bitflags::bitflags;

bitflags! {
    /// What a buffer layer allows callers to do with it.
    pub struct BufferFlags: u32 {
        const CLEANABLE = 0x0010;
        const FLUSHABLE = 0x0020;
        const REMOVABLE = 0x0040;
        const STDFLAGS = Self::CLEANABLE.bits | Self::FLUSHABLE.bits | Self::REMOVABLE.bits;
    }
}

impl Default for BufferFlags {
    fn default() -> Self {
        BufferFlags::STDFLAGS
    }
}

/// One output buffer layer.
#[derive(Debug, Clone, Default)]
pub struct BufferLayer {
    name: String,
    flags: Option<BufferFlags>,
    deletable: Option<bool>,
    data: Vec<u8>,
}

impl BufferLayer {
    /// Create a layer with the given flags.
    pub fn new(name: impl Into<String>, flags: BufferFlags) -> Self {
        Self {
            name: name.into(),
            flags: Some(flags),
            deletable: None,
            data: Vec::new(),
        }
    }

    /// Create a layer that reports no flags at all.
    pub fn unflagged(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the explicit deletion flag, which overrides the layer flags.
    pub fn with_deletable(mut self, deletable: bool) -> Self {
        self.deletable = Some(deletable);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn flags(&self) -> Option<BufferFlags> {
        self.flags
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether this layer may be closed by a caller needing `required`.
    ///
    /// An explicit deletion flag decides on its own; otherwise a layer without
    /// flags is closable and a flagged layer must carry every required flag.
    #[inline]
    pub fn is_closable(&self, required: BufferFlags) -> bool {
        match self.deletable {
            Some(deletable) => deletable,
            None => self.flags.map_or(true, |flags| flags.contains(required)),
        }
    }
}

/// Output stream with a stack of buffer layers in front of a sink.
#[derive(Debug)]
pub struct OutputStream<W> {
    layers: Vec<BufferLayer>,
    sink: W,
}

impl<W: Write> OutputStream<W> {
    pub fn new(sink: W) -> Self {
        Self {
            layers: Vec::new(),
            sink,
        }
    }

    /// Number of active buffer layers.
    #[inline]
    pub fn level(&self) -> usize {
        self.layers.len()
    }

    /// Active layers, outermost first.
    #[inline]
    pub fn layers(&self) -> &[BufferLayer] {
        &self.layers
    }

    /// Start a new innermost layer. Returns the new level.
    pub fn start(&mut self, name: impl Into<String>, flags: BufferFlags) -> usize {
        self.push(BufferLayer::new(name, flags))
    }

    /// Push a prepared layer. Returns the new level.
    pub fn push(&mut self, layer: BufferLayer) -> usize {
        self.layers.push(layer);
        self.layers.len()
    }

    #[inline]
    pub fn sink(&self) -> &W {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Pop the innermost layer and pass its bytes down.
    ///
    /// Returns false when there is no layer.
    pub fn end_flush(&mut self) -> io::Result<bool> {
        let Some(layer) = self.layers.pop() else {
            return Ok(false);
        };

        tracing::trace!(layer = %layer.name, bytes = layer.data.len(), "Flushing output buffer");
        self.write_below(&layer.data)?;
        Ok(true)
    }

    /// Pop the innermost layer and discard its bytes.
    ///
    /// Returns false when there is no layer.
    pub fn end_clean(&mut self) -> bool {
        match self.layers.pop() {
            Some(layer) => {
                tracing::trace!(layer = %layer.name, bytes = layer.data.len(), "Discarding output buffer");
                true
            }
            None => false,
        }
    }

    /// Flush every layer regardless of its flags.
    pub fn flush_all(&mut self) -> io::Result<()> {
        while self.end_flush()? {}
        self.sink.flush()
    }

    /// Flush (or clean) layers down to `target_level`.
    ///
    /// Walks from the innermost layer outwards and stops at the first layer
    /// that may not be closed, so the resulting level can be above the
    /// target. Returns the resulting level.
    pub fn close_output_buffers(&mut self, target_level: usize, flush: bool) -> io::Result<usize> {
        let required = BufferFlags::REMOVABLE
            | if flush {
                BufferFlags::FLUSHABLE
            } else {
                BufferFlags::CLEANABLE
            };

        while self.layers.len() > target_level {
            let closable = self
                .layers
                .last()
                .is_some_and(|layer| layer.is_closable(required));
            if !closable {
                break;
            }

            if flush {
                self.end_flush()?;
            } else {
                self.end_clean();
            }
        }

        if flush {
            self.sink.flush()?;
        }
        Ok(self.layers.len())
    }

    /// Consume the stream, returning the sink. Buffered bytes are dropped.
    pub fn into_sink(self) -> W {
        self.sink
    }

    fn write_below(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        match self.layers.last_mut() {
            Some(layer) => {
                layer.data.extend_from_slice(data);
                Ok(())
            }
            None => self.sink.write_all(data),
        }
    }
}

impl<W: Write> Write for OutputStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_below(buf)?;
        Ok(buf.len())
    }

    /// Flushes the sink only; buffered layers keep their bytes.
    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
