mod cbs;
mod ps1;
mod psu;
mod psv;

pub use cbs::*;
pub use ps1::*;
pub use psu::*;
pub use psv::*;
