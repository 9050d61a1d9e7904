mod key_parser;
mod public;
mod secret;
mod shared;
mod user;

pub(crate) use self::shared::merge_signatures;

pub use self::public::{SignedPublicKey, SignedPublicKeyParser, SignedPublicSubKey};
pub use self::secret::{SignedSecretKey, SignedSecretKeyParser, SignedSecretSubKey};
pub use self::shared::SignedKeyDetails;
pub use self::user::{SignedUser, SignedUserAttribute};
