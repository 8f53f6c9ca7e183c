use crate::error::{EngineErr, Result};

/// The single slot holding the last requested result until it's copied out.
#[derive(Debug, Default)]
pub struct PendingResult {
    bytes: Option<Vec<u8>>,
}

impl PendingResult {
    /// Replaces the pending result with `bytes`.
    ///
    /// # Returns
    /// The length a caller must allocate to copy the result out.
    pub fn store(&mut self, bytes: Vec<u8>) -> usize {
        let len = bytes.len();
        self.bytes = Some(bytes);
        len
    }

    /// The length of the pending result, if there is one.
    pub fn len(&self) -> Option<usize> {
        self.bytes.as_ref().map(Vec::len)
    }

    /// Copies the pending result into `buf` and clears the slot.
    ///
    /// # Returns
    /// A `NoPendingResult` error if nothing was requested, or a `BufferSizeMismatch`
    /// error if `buf` isn't exactly as long as the result, which is then kept.
    pub fn copy_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let Some(bytes) = &self.bytes else {
            return Err(EngineErr::NoPendingResult);
        };

        if bytes.len() != buf.len() {
            return Err(EngineErr::BufferSizeMismatch {
                expected: bytes.len(),
                got: buf.len(),
            });
        }

        buf.copy_from_slice(bytes);
        self.bytes = None;
        Ok(())
    }
}
