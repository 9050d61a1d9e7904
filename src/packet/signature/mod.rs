mod config;
mod de;
mod ser;
mod types;

pub use self::config::{SignatureConfig, SignatureVersionSpecific};
pub use self::types::*;
