/* 📖 # Why have livewire_base as a core library?
livewire_base provides the error type, tracing setup and the Platform Abstraction Layer
used by the engine and the CLI. Everything that touches the filesystem or the network
lives behind the PAL so the engine can be tested against MockPal.
*/

pub mod error;
pub mod pal;
mod pal_tests;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{LivewireError, ResultExt};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal};

/// Standard result type for livewire operations.
pub type LivewireResult<T> = error::Result<T>;
