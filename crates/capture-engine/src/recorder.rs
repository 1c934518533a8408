//! The platform encoder contract.

use camlayer_common::error::CamlayerResult;
use tokio::sync::mpsc;

use crate::stream::CombinedStream;

/// Whether the encoder is currently consuming a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
}

/// Notifications emitted by a recorder, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A fragment of encoded output. May be empty.
    DataAvailable(Vec<u8>),
    /// The recorder has flushed its last fragment and stopped.
    Stopped,
}

/// An encoder that turns a [`CombinedStream`] into container fragments.
///
/// Implementations deliver `DataAvailable` notifications while recording
/// and exactly one `Stopped` after [`Recorder::stop`] has drained the
/// encoder. Fragments concatenated in notification order form one
/// playable file.
pub trait Recorder: Send {
    /// Begin encoding `stream`, reporting through `events`.
    fn start(
        &mut self,
        stream: CombinedStream,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> CamlayerResult<()>;

    /// Request the encoder stop. `Stopped` follows asynchronously.
    fn stop(&mut self) -> CamlayerResult<()>;

    fn state(&self) -> RecorderState;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
