use num_bigint::traits::ModInverse;
use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, Rng};

use crate::errors::Result;
use crate::types::Mpi;

/// Elgamal encryption with EME-PKCS1-v1_5 message encoding.
/// Produces the two MPIs `g^k mod p` and `m * y^k mod p`.
pub fn encrypt<R: CryptoRng + Rng>(
    mut rng: R,
    p: &[u8],
    g: &[u8],
    y: &[u8],
    plaintext: &[u8],
) -> Result<Vec<Mpi>> {
    let p = BigUint::from_bytes_be(p);
    let g = BigUint::from_bytes_be(g);
    let y = BigUint::from_bytes_be(y);

    let k_size = (p.bits() + 7) / 8;
    ensure!(k_size >= plaintext.len() + 11, "message too long");

    // EME-PKCS1-v1_5: 0x02 || PS (nonzero) || 0x00 || M, the leading zero
    // octet vanishes in the integer representation
    let ps_len = k_size - plaintext.len() - 3;
    let mut em = Vec::with_capacity(k_size - 1);
    em.push(0x02);
    for _ in 0..ps_len {
        em.push(rng.gen_range(1..=255u8));
    }
    em.push(0x00);
    em.extend_from_slice(plaintext);

    let m = BigUint::from_bytes_be(&em);

    let one = BigUint::from(1u8);
    let k = rng.gen_biguint_range(&one, &(&p - &one));

    let c1 = g.modpow(&k, &p);
    let c2 = (m * y.modpow(&k, &p)) % &p;

    Ok(vec![(&c1).into(), (&c2).into()])
}

/// Elgamal decryption, undoing the EME-PKCS1-v1_5 encoding.
pub fn decrypt(p: &BigUint, x: &BigUint, mpis: &[Mpi]) -> Result<Vec<u8>> {
    ensure_eq!(mpis.len(), 2, "invalid elgamal mpi count");

    let c1 = mpis[0].to_biguint();
    let c2 = mpis[1].to_biguint();

    let s = c1.modpow(x, p);
    let s_inv = s
        .mod_inverse(p)
        .and_then(|i| i.to_biguint())
        .ok_or_else(|| format_err!("invalid elgamal ciphertext"))?;

    let em = ((c2 * s_inv) % p).to_bytes_be();

    ensure!(em.len() > 10 && em[0] == 0x02, "invalid padding");
    let sep = em
        .iter()
        .position(|b| *b == 0)
        .ok_or_else(|| format_err!("invalid padding"))?;
    // at least 8 octets of padding
    ensure!(sep >= 9, "invalid padding");

    Ok(em[sep + 1..].to_vec())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        // RFC 5114 1024-bit MODP group with 160-bit prime order subgroup
        let p = BigUint::parse_bytes(
            b"B10B8F96A080E01DDE92DE5EAE5D54EC52C99FBCFB06A3C69A6A9DCA52D23B61\
              6073E28675A23D189838EF1E2EE652C013ECB4AEA906112324975C3CD49B83BF\
              ACCBDD7D90C4BD7098488E9C219A73724EFFD6FAE5644738FAA31A4FF55BCCC0\
              A151AF5F0DC8B4BD45BF37DF365C1A65E68CFDA76D4DA708DF1FB2BC2E4A4371",
            16,
        )
        .unwrap();
        let g = BigUint::parse_bytes(
            b"A4D1CBD5C3FD34126765A442EFB99905F8104DD258AC507FD6406CFF14266D31\
              266FEA1E5C41564B777E690F5504F213160217B4B01B886A5E91547F9E2749F4\
              D7FBD7D3B9A92EE1909D0D2263F80A76A6A24C087A091F531DBF0A0169B6A28A\
              D662A4D18E73AFA32D779D5918D08BC8858F4DCEF97C2A24855E6EEB22B3B2E5",
            16,
        )
        .unwrap();

        let x = rng.gen_biguint_range(&BigUint::from(2u8), &p);
        let y = g.modpow(&x, &p);

        let mpis = encrypt(
            &mut rng,
            &p.to_bytes_be(),
            &g.to_bytes_be(),
            &y.to_bytes_be(),
            b"session key",
        )
        .unwrap();

        let plain = decrypt(&p, &x, &mpis).unwrap();
        assert_eq!(plain, b"session key");
    }
}
