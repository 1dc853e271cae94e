//! The encoding engine seam.

use crate::error::{EncodeError, EncodeResult};
use crate::request::EncodeRequest;

/// An external encoder with its own isolated file store.
///
/// Files are addressed by bare names inside the engine's storage. One
/// engine instance runs at most one job at a time; `EncoderDriver`
/// serializes access.
pub trait EncodingEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Place `data` into engine storage under `name`, replacing any
    /// existing file.
    fn write_file(&self, name: &str, data: &[u8]) -> EncodeResult<()>;

    /// Read a file back out of engine storage.
    fn read_file(&self, name: &str) -> EncodeResult<Vec<u8>>;

    /// Remove a file from engine storage.
    fn unlink(&self, name: &str) -> EncodeResult<()>;

    /// Run one encode. `on_progress` receives completion ratios, which may
    /// be skipped, repeated, or exceed 1.
    fn run(&self, request: &EncodeRequest, on_progress: &mut dyn FnMut(f32)) -> EncodeResult<()>;

    /// Release all engine storage. The engine is unusable afterwards.
    fn teardown(&self) -> EncodeResult<()>;
}

/// Reject names that would escape the engine's flat file store.
pub fn validate_name(name: &str) -> EncodeResult<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(EncodeError::Staging {
            name: name.to_string(),
            reason: "not a plain file name".into(),
        });
    }
    Ok(())
}
