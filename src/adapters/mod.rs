// Adapters layer: concrete implementations for the OS (filesystem search,
// serial devices, child processes).

pub mod locator;
pub mod process;
pub mod serial;

pub use locator::{NullLocator, SearchDir, SearchPathLocator, DEFAULT_AVRDUDE_CONF};
pub use process::SystemProcessRunner;
pub use serial::{GlobPortEnumerator, NoPortEnumerator, SerialLibraryEnumerator};
