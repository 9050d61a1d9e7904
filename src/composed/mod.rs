pub mod key;
pub mod message;
pub mod shared;
pub mod signature;
pub mod signed_key;

pub use self::key::*;
pub use self::message::*;
pub use self::shared::Deserializable;
pub use self::signature::StandaloneSignature;
pub use self::signed_key::*;
