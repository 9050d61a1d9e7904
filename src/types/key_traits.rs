use rand::{CryptoRng, Rng};

use crate::crypto::hash::HashAlgorithm;
use crate::crypto::public_key::PublicKeyAlgorithm;
use crate::errors::Result;
use crate::types::{KeyId, Mpi, SecretKeyRepr};

pub trait KeyTrait {
    fn fingerprint(&self) -> Vec<u8>;
    fn key_id(&self) -> KeyId;
    fn algorithm(&self) -> PublicKeyAlgorithm;
}

impl<T: KeyTrait> KeyTrait for &T {
    fn fingerprint(&self) -> Vec<u8> {
        (*self).fingerprint()
    }

    fn key_id(&self) -> KeyId {
        (*self).key_id()
    }

    fn algorithm(&self) -> PublicKeyAlgorithm {
        (*self).algorithm()
    }
}

pub trait PublicKeyTrait: KeyTrait {
    /// Verify a signed message.
    /// Data will be hashed using `hash`, before verifying.
    fn verify_signature(&self, hash: HashAlgorithm, data: &[u8], sig: &[Mpi]) -> Result<()>;

    /// Encrypt the given `plain` for this key.
    fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>>;

    /// The public key body, with the `0x99` and length prefix used both for
    /// fingerprints and signature hashing.
    fn serialize_for_hashing(&self) -> Result<Vec<u8>>;
}

impl<T: PublicKeyTrait> PublicKeyTrait for &T {
    fn verify_signature(&self, hash: HashAlgorithm, data: &[u8], sig: &[Mpi]) -> Result<()> {
        (*self).verify_signature(hash, data, sig)
    }

    fn encrypt<R: CryptoRng + Rng>(&self, rng: &mut R, plain: &[u8]) -> Result<Vec<Mpi>> {
        (*self).encrypt(rng, plain)
    }

    fn serialize_for_hashing(&self) -> Result<Vec<u8>> {
        (*self).serialize_for_hashing()
    }
}

pub trait SecretKeyTrait: PublicKeyTrait {
    /// Decrypt the secret key material and pass it to `work`.
    fn unlock<F, G, T>(&self, pw: F, work: G) -> Result<T>
    where
        F: FnOnce() -> String,
        G: FnOnce(&SecretKeyRepr) -> Result<T>;

    /// Produce the signature MPIs over the already hashed data.
    fn create_signature(&self, key_pw: &str, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<Mpi>>;
}
