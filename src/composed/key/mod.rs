mod builder;
mod secret;
mod shared;

pub use self::builder::{
    KeyType, SecretKeyParams, SecretKeyParamsBuilder, SubkeyParams, SubkeyParamsBuilder,
};
pub use self::secret::{SecretKey, SecretSubkey};
pub use self::shared::KeyDetails;
