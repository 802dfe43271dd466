mod bytes;
mod entry;
pub mod sjis;

pub use bytes::*;
pub use entry::*;
