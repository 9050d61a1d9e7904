pub(crate) mod public;
pub(crate) mod secret;

pub use self::public::{PublicKey, PublicSubkey};
pub use self::secret::{SecretKey, SecretSubkey};
