//! Double-buffered PCM pipeline.
//!
//! Two PCM buffers alternate between the fill side, which copies bytes in
//! from storage, and the encode side, which turns them into wire words one
//! chunk at a time:
//!
//! ```text
//!             acquire_fill_target          mark_filled
//!   Stale ───────────────────────► Filling ───────────► Ready
//!     ▲          (drop target)        │                   │
//!     └───────────────────────────────┘                   │
//!     └───────────────────── consume_chunk (last chunk) ──┘
//! ```
//!
//! Transmission starts only once both buffers are Ready, so one is always
//! being drained while the other refills. Nothing slows the encode side down
//! when the fill side falls behind; it counts an underrun and the hardware
//! repeats old wire data.

mod context;
mod state;
mod wire;

pub use context::{ChunkOutcome, FillTarget, PipelineContext, PipelineSnapshot};
pub use state::{BufferId, BufferState};
pub use wire::{Channel, WireBuffers};
