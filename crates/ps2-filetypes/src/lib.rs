mod common;
pub mod crypto;
mod error;
pub mod lzari;
mod parser;
mod writer;

pub use chrono;
pub use common::*;
pub use error::{Error, Result};
pub use parser::*;
pub use writer::*;
