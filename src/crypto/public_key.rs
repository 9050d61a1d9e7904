use num_enum::{FromPrimitive, IntoPrimitive};

/// Available public key algorithms.
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-9.1>
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, FromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum PublicKeyAlgorithm {
    /// RSA (Encrypt and Sign)
    RSA = 1,
    /// RSA Encrypt-Only (deprecated)
    RSAEncrypt = 2,
    /// RSA Sign-Only (deprecated)
    RSASign = 3,
    /// Elgamal (Encrypt-Only)
    Elgamal = 16,
    /// DSA (Digital Signature Algorithm)
    DSA = 17,
    /// Reserved: Elliptic Curve
    ECDH = 18,
    /// Reserved: ECDSA
    ECDSA = 19,
    /// Reserved (formerly Elgamal Encrypt or Sign)
    ElgamalSign = 20,
    /// Reserved: Diffie-Hellman (X9.42)
    DiffieHellman = 21,
    /// EdDSA (not part of RFC 4880)
    EdDSA = 22,

    #[num_enum(catch_all)]
    Other(u8),
}

impl PublicKeyAlgorithm {
    /// Can this algorithm produce signatures?
    pub fn can_sign(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSASign | PublicKeyAlgorithm::DSA
        )
    }

    /// Can this algorithm encrypt session keys?
    pub fn can_encrypt(self) -> bool {
        matches!(
            self,
            PublicKeyAlgorithm::RSA | PublicKeyAlgorithm::RSAEncrypt | PublicKeyAlgorithm::Elgamal
        )
    }
}
