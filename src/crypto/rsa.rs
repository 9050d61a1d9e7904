use log::debug;
use num_bigint::traits::ModInverse;
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};

use crate::crypto::hash::HashAlgorithm;
use crate::errors::Result;
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// The padding schemes expect input of exactly the modulus width, MPIs may
/// be shorter than that.
fn left_pad(data: &[u8], size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size.saturating_sub(data.len())];
    out.extend_from_slice(data);
    out
}

/// RSA decryption using PKCS1v15 padding.
pub fn decrypt(priv_key: &RsaPrivateKey, mpis: &[Mpi]) -> Result<Vec<u8>> {
    // rsa consist of exactly one mpi
    ensure_eq!(mpis.len(), 1, "invalid rsa mpi count");
    debug!("RSA decrypt");

    let ciphertext = left_pad(mpis[0].as_ref(), priv_key.size());
    let m = priv_key.decrypt(Pkcs1v15Encrypt, &ciphertext)?;

    Ok(m)
}

/// RSA encryption using PKCS1v15 padding.
pub fn encrypt<R: CryptoRng + Rng>(
    mut rng: R,
    n: &[u8],
    e: &[u8],
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    debug!("RSA encrypt");

    let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))?;
    let data = key.encrypt(&mut rng, Pkcs1v15Encrypt, plaintext)?;

    Ok(vec![Mpi::from_slice(&data)])
}

/// Generate an RSA KeyPair.
pub fn generate_key<R: Rng + CryptoRng>(
    mut rng: R,
    bit_size: usize,
) -> Result<(PublicParams, PlainSecretParams)> {
    debug!("RSA generate key {} bits", bit_size);
    let key = RsaPrivateKey::new(&mut rng, bit_size)?;

    let p = &key.primes()[0];
    let q = &key.primes()[1];
    let u = p
        .clone()
        .mod_inverse(q)
        .and_then(|u| u.to_biguint())
        .ok_or_else(|| format_err!("invalid prime"))?;

    Ok((
        PublicParams::RSA {
            n: key.n().into(),
            e: key.e().into(),
        },
        PlainSecretParams::RSA {
            d: key.d().into(),
            p: p.into(),
            q: q.into(),
            u: (&u).into(),
        },
    ))
}

/// Verify a RSA, PKCS1v15 padded signature.
pub fn verify(n: &[u8], e: &[u8], hash: HashAlgorithm, hashed: &[u8], sig: &[u8]) -> Result<()> {
    let key = RsaPublicKey::new(BigUint::from_bytes_be(n), BigUint::from_bytes_be(e))?;
    let sig = left_pad(sig, key.size());

    key.verify(sig_hash(hash)?, hashed, &sig).map_err(Into::into)
}

/// Sign using RSA, with PKCS1v15 padding.
pub fn sign(key: &RsaPrivateKey, hash: HashAlgorithm, digest: &[u8]) -> Result<Vec<Mpi>> {
    let sig = key.sign(sig_hash(hash)?, digest)?;

    Ok(vec![Mpi::from_slice(&sig)])
}

fn sig_hash(hash: HashAlgorithm) -> Result<Pkcs1v15Sign> {
    match hash {
        HashAlgorithm::MD5 => Ok(Pkcs1v15Sign::new::<md5::Md5>()),
        HashAlgorithm::SHA1 => Ok(Pkcs1v15Sign::new::<sha1::Sha1>()),
        HashAlgorithm::RIPEMD160 => Ok(Pkcs1v15Sign::new::<ripemd::Ripemd160>()),
        HashAlgorithm::SHA2_256 => Ok(Pkcs1v15Sign::new::<sha2::Sha256>()),
        HashAlgorithm::SHA2_384 => Ok(Pkcs1v15Sign::new::<sha2::Sha384>()),
        HashAlgorithm::SHA2_512 => Ok(Pkcs1v15Sign::new::<sha2::Sha512>()),
        HashAlgorithm::SHA2_224 => Ok(Pkcs1v15Sign::new::<sha2::Sha224>()),
        _ => unsupported_err!("hash algorithm {:?} for RSA", hash),
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (public_params, secret_params) = generate_key(&mut rng, 1024).unwrap();

        let (n, e) = match &public_params {
            PublicParams::RSA { n, e } => (n.clone(), e.clone()),
            _ => panic!("invalid key generated"),
        };

        let repr = secret_params.as_repr(&public_params).unwrap();
        let key = match repr {
            crate::types::SecretKeyRepr::RSA(key) => key,
            _ => panic!("invalid key generated"),
        };

        let digest = HashAlgorithm::SHA2_256.digest(b"hello").unwrap();
        let sig = sign(&key, HashAlgorithm::SHA2_256, &digest).unwrap();
        assert_eq!(sig.len(), 1);

        verify(n.as_ref(), e.as_ref(), HashAlgorithm::SHA2_256, &digest, sig[0].as_ref()).unwrap();

        let other = HashAlgorithm::SHA2_256.digest(b"hallo").unwrap();
        assert!(verify(n.as_ref(), e.as_ref(), HashAlgorithm::SHA2_256, &other, sig[0].as_ref()).is_err());
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (public_params, secret_params) = generate_key(&mut rng, 1024).unwrap();

        let (n, e) = match &public_params {
            PublicParams::RSA { n, e } => (n.clone(), e.clone()),
            _ => panic!("invalid key generated"),
        };

        let mpis = encrypt(&mut rng, n.as_ref(), e.as_ref(), b"session key bytes").unwrap();

        let repr = secret_params.as_repr(&public_params).unwrap();
        let key = match repr {
            crate::types::SecretKeyRepr::RSA(key) => key,
            _ => panic!("invalid key generated"),
        };

        let plain = decrypt(&key, &mpis).unwrap();
        assert_eq!(plain, b"session key bytes");
    }
}
