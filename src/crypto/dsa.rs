use dsa::{Components, KeySize, SigningKey, VerifyingKey};
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use signature::hazmat::{PrehashSigner, PrehashVerifier};

use crate::errors::Result;
use crate::types::{Mpi, PlainSecretParams, PublicParams};

/// DSA key sizes we are willing to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsaKeySize {
    B1024,
    B2048,
    B3072,
}

impl From<DsaKeySize> for KeySize {
    fn from(value: DsaKeySize) -> Self {
        match value {
            #[allow(deprecated)]
            DsaKeySize::B1024 => KeySize::DSA_1024_160,
            DsaKeySize::B2048 => KeySize::DSA_2048_256,
            DsaKeySize::B3072 => KeySize::DSA_3072_256,
        }
    }
}

/// Generate a DSA KeyPair.
pub fn generate_key<R: Rng + CryptoRng>(
    mut rng: R,
    key_size: DsaKeySize,
) -> Result<(PublicParams, PlainSecretParams)> {
    let components = Components::generate(&mut rng, key_size.into());
    let signing_key = SigningKey::generate(&mut rng, components);
    let verifying_key = signing_key.verifying_key();
    let components = verifying_key.components();

    Ok((
        PublicParams::DSA {
            p: Mpi::from_slice(&components.p().to_bytes_be()),
            q: Mpi::from_slice(&components.q().to_bytes_be()),
            g: Mpi::from_slice(&components.g().to_bytes_be()),
            y: Mpi::from_slice(&verifying_key.y().to_bytes_be()),
        },
        PlainSecretParams::DSA {
            x: Mpi::from_slice(&signing_key.x().to_bytes_be()),
        },
    ))
}

/// Build a signing key from the raw parameters.
pub fn signing_key(
    p: &BigUint,
    q: &BigUint,
    g: &BigUint,
    y: &BigUint,
    x: &BigUint,
) -> Result<SigningKey> {
    let components = Components::from_components(p.clone(), q.clone(), g.clone())
        .map_err(|e| format_err!("invalid dsa components: {:?}", e))?;
    let verifying_key = VerifyingKey::from_components(components, y.clone())
        .map_err(|e| format_err!("invalid dsa public key: {:?}", e))?;

    SigningKey::from_components(verifying_key, x.clone())
        .map_err(|e| format_err!("invalid dsa secret key: {:?}", e))
}

/// Sign the hashed data, returning `r` and `s`.
pub fn sign(key: &SigningKey, hashed: &[u8]) -> Result<Vec<Mpi>> {
    let sig: dsa::Signature = key
        .sign_prehash(hashed)
        .map_err(|e| format_err!("dsa signing: {:?}", e))?;

    Ok(vec![
        Mpi::from_slice(&sig.r().to_bytes_be()),
        Mpi::from_slice(&sig.s().to_bytes_be()),
    ])
}

/// Verify a DSA signature.
pub fn verify(
    p: &BigUint,
    q: &BigUint,
    g: &BigUint,
    y: &BigUint,
    hashed: &[u8],
    sig: &[Mpi],
) -> Result<()> {
    ensure_eq!(sig.len(), 2, "invalid dsa signature");

    let components = Components::from_components(p.clone(), q.clone(), g.clone())
        .map_err(|e| format_err!("invalid dsa components: {:?}", e))?;
    let verifying_key = VerifyingKey::from_components(components, y.clone())
        .map_err(|e| format_err!("invalid dsa public key: {:?}", e))?;

    let signature = dsa::Signature::from_components(
        BigUint::from_bytes_be(sig[0].as_ref()),
        BigUint::from_bytes_be(sig[1].as_ref()),
    )
    .map_err(|e| format_err!("invalid dsa signature: {:?}", e))?;

    verifying_key
        .verify_prehash(hashed, &signature)
        .map_err(|_| format_err!("invalid signature"))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::crypto::hash::HashAlgorithm;

    #[test]
    fn test_sign_verify_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (public_params, secret_params) = generate_key(&mut rng, DsaKeySize::B1024).unwrap();

        let (p, q, g, y) = match &public_params {
            PublicParams::DSA { p, q, g, y } => (
                p.to_biguint(),
                q.to_biguint(),
                g.to_biguint(),
                y.to_biguint(),
            ),
            _ => panic!("invalid key generated"),
        };

        let repr = secret_params.as_repr(&public_params).unwrap();
        let key = match repr {
            crate::types::SecretKeyRepr::DSA(key) => key,
            _ => panic!("invalid key generated"),
        };

        let digest = HashAlgorithm::SHA1.digest(b"hello").unwrap();
        let sig = sign(&key, &digest).unwrap();

        verify(&p, &q, &g, &y, &digest, &sig).unwrap();

        let other = HashAlgorithm::SHA1.digest(b"hallo").unwrap();
        assert!(verify(&p, &q, &g, &y, &other, &sig).is_err());
    }
}
