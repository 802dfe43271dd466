mod cbs;
pub mod psv;

pub use cbs::{cbs_crypt, CbsCipher};
