use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::{decode_frame, encode_frame, FrameConfig};
use crate::error::FrameError;
use crate::message::Multipart;

/// `tokio_util` codec that turns a byte stream into whole [`Multipart`] messages.
///
/// Frames flagged MORE are buffered until the closing frame arrives, so
/// callers always receive complete messages.
#[derive(Debug, Default)]
pub struct MultipartCodec {
    config: FrameConfig,
    pending: Vec<Bytes>,
}

impl MultipartCodec {
    /// Create a codec with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit limits.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
        }
    }

    /// Current codec limits.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for MultipartCodec {
    type Item = Multipart;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Multipart>, FrameError> {
        while let Some(frame) = decode_frame(src, self.config.max_frame_size)? {
            self.pending.push(frame.payload);
            if self.pending.len() > self.config.max_parts {
                let count = self.pending.len();
                self.pending.clear();
                return Err(FrameError::TooManyParts {
                    count,
                    max: self.config.max_parts,
                });
            }
            if !frame.more {
                let parts = std::mem::take(&mut self.pending);
                trace!(frames = parts.len(), "decoded multipart message");
                return Ok(Some(Multipart::from(parts)));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Multipart>, FrameError> {
        match self.decode(src)? {
            Some(msg) => Ok(Some(msg)),
            None if src.is_empty() && self.pending.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Multipart> for MultipartCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Multipart, dst: &mut BytesMut) -> Result<(), FrameError> {
        if item.is_empty() {
            return Err(FrameError::EmptyMessage);
        }
        if item.len() > self.config.max_parts {
            return Err(FrameError::TooManyParts {
                count: item.len(),
                max: self.config.max_parts,
            });
        }
        if let Some(part) = item
            .iter()
            .find(|part| part.len() > self.config.max_frame_size)
        {
            return Err(FrameError::FrameTooLarge {
                size: part.len(),
                max: self.config.max_frame_size,
            });
        }

        let last = item.len() - 1;
        for (index, part) in item.iter().enumerate() {
            encode_frame(part, index < last, dst)?;
        }
        Ok(())
    }
}
