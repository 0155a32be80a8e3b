/* 📖 # What is the Platform Abstraction Layer?

The PAL is the only door to the outside world: files, directory listings and watches,
the inbound HTTP server and outbound HTTP calls. Engine code depends on the `Pal` trait,
RealPal implements it against the operating system and MockPal keeps everything in memory.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{FileChangeCallback, FileChangeEvent, Pal, PalHandle};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::LivewireResult;

/// Compile glob patterns into a set. `*` does not cross `/`.
pub(crate) fn build_glob_set(globs: &[String]) -> LivewireResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let compiled = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|e| crate::err!("Invalid glob pattern '{}': {}", glob, e))?;
        builder.add(compiled);
    }
    builder
        .build()
        .map_err(|e| crate::err!("Failed to build glob set: {}", e))
}
