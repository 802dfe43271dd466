mod cbs;
mod icn;
mod icon_sys;
mod max;
mod ps1;
mod psu;
mod psv;
mod xps;

pub use cbs::*;
pub use icn::*;
pub use icon_sys::*;
pub use max::*;
pub use ps1::*;
pub use psu::*;
pub use psv::*;
pub use xps::*;

/// Upper bound for any decompressed payload. Declared sizes in MAX and CBS
/// headers are not trusted beyond this.
pub const MAX_DECOMPRESSED_SIZE: usize = 8 * 1024 * 1024;
