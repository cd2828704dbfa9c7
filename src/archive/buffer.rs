//! Byte buffer shared between the zip writer and the chunk sink

use bytes::Bytes;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// Write target for [`zip::ZipWriter`] that can be drained from outside
///
/// The writer owns one handle and the streamer keeps another; after every
/// entry the streamer takes whatever the writer produced and forwards it as one
/// chunk. Nothing is retained once drained.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChunkBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl ChunkBuffer {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panic while holding the lock cannot leave the Vec half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Bytes {
        Bytes::from(std::mem::take(&mut *self.lock()))
    }

    /// Bytes currently waiting to be drained
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}

impl Write for ChunkBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
