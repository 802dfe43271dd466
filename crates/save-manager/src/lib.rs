//! Moves PS1 and PS2 saves between memory cards and the container formats
//! used by save tools on PC, PS3 and emulators.

mod bulk;
mod convert;
mod error;
mod export;
mod icon;
mod import;
mod naming;
mod probe;
mod progress;
mod settings;

pub use bulk::*;
pub use convert::*;
pub use error::{Error, Result};
pub use export::*;
pub use icon::*;
pub use import::*;
pub use naming::*;
pub use probe::{probe, probe_bytes, SaveFormat};
pub use progress::{ConsoleProgress, NoProgress, Progress};
pub use settings::{load_settings, Settings, SETTINGS_FILE};
