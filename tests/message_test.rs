#[macro_use]
extern crate pretty_assertions;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use opgp::cleartext::CleartextSignedMessage;
use opgp::composed::{
    Deserializable, KeyType, Message, SecretKeyParamsBuilder, SignedSecretKey, StandaloneSignature,
    SubkeyParamsBuilder,
};
use opgp::crypto::hash::HashAlgorithm;
use opgp::crypto::public_key::PublicKeyAlgorithm;
use opgp::crypto::sym::SymmetricKeyAlgorithm;
use opgp::packet::{SignatureConfig, SignatureType};
use opgp::ser::Serialize;
use opgp::types::CompressionAlgorithm;

const PASSPHRASE: &str = "p";

fn gen_rsa_key(seed: u64) -> SignedSecretKey {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let params = SecretKeyParamsBuilder::default()
        .key_type(KeyType::Rsa(1024))
        .can_certify(true)
        .can_sign(true)
        .can_encrypt(true)
        .primary_user_id("alice <alice@example.com>".to_string())
        .passphrase(Some(PASSPHRASE.to_string()))
        .subkey(
            SubkeyParamsBuilder::default()
                .key_type(KeyType::Rsa(1024))
                .can_encrypt(true)
                .passphrase(Some(PASSPHRASE.to_string()))
                .build()
                .expect("valid subkey params"),
        )
        .build()
        .expect("valid params");

    params
        .generate(&mut rng)
        .expect("key generation")
        .sign(PASSPHRASE)
        .expect("self signing")
}

#[test]
fn test_encrypt_decrypt_rsa_mdc() {
    let mut rng = ChaCha8Rng::seed_from_u64(100);
    let key = gen_rsa_key(20);
    let public = key.public_key();

    let message = Message::new_literal("", "hello");
    let encrypted = message
        .encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &[&public], true)
        .expect("encryption");

    // through the wire
    let bytes = encrypted.to_bytes().expect("serialize");
    let parsed = Message::from_bytes(&bytes).expect("parse");

    let decrypted = parsed.decrypt(PASSPHRASE, &[&key]).expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"hello".to_vec())
    );
}

#[test]
fn test_encrypt_decrypt_rsa_no_mdc() {
    let mut rng = ChaCha8Rng::seed_from_u64(101);
    let key = gen_rsa_key(21);
    let public = key.public_key();

    let message = Message::new_literal("", "hello without mdc");
    let encrypted = message
        .encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES128, &[&public], false)
        .expect("encryption");

    let bytes = encrypted.to_bytes().expect("serialize");
    let parsed = Message::from_bytes(&bytes).expect("parse");

    let decrypted = parsed.decrypt(PASSPHRASE, &[&key]).expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"hello without mdc".to_vec())
    );
}

#[test]
fn test_encrypt_to_subkey() {
    let mut rng = ChaCha8Rng::seed_from_u64(102);
    let key = gen_rsa_key(22);
    let public = key.public_key();

    // address the encryption subkey directly
    let subkey = &public.public_subkeys[0];
    let message = Message::new_literal("", "to the subkey");
    let encrypted = message
        .encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &[subkey], true)
        .expect("encryption");

    let decrypted = encrypted.decrypt(PASSPHRASE, &[&key]).expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"to the subkey".to_vec())
    );
}

#[test]
fn test_mdc_tamper_rejected() {
    let mut rng = ChaCha8Rng::seed_from_u64(103);
    let key = gen_rsa_key(23);
    let public = key.public_key();

    let message = Message::new_literal("", "tamper me");
    let encrypted = message
        .encrypt_to_keys(&mut rng, SymmetricKeyAlgorithm::AES256, &[&public], true)
        .expect("encryption");

    let mut bytes = encrypted.to_bytes().expect("serialize");
    // flip one bit in the final byte, which lands in the mdc
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let parsed = Message::from_bytes(&bytes).expect("parse");
    assert!(parsed.decrypt(PASSPHRASE, &[&key]).is_err());
}

#[test]
fn test_symmetric_roundtrip() {
    let mut rng = ChaCha8Rng::seed_from_u64(104);

    let message = Message::new_literal("", "symmetric secret");
    let encrypted = message
        .encrypt_with_password(&mut rng, "pw", SymmetricKeyAlgorithm::AES256, true)
        .expect("encryption");

    let bytes = encrypted.to_bytes().expect("serialize");
    let parsed = Message::from_bytes(&bytes).expect("parse");

    let decrypted = parsed.decrypt_with_password("pw").expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"symmetric secret".to_vec())
    );

    // a wrong passphrase fails before producing any plaintext
    assert!(parsed.decrypt_with_password("wrong").is_err());
}

#[test]
fn test_symmetric_roundtrip_no_mdc() {
    let mut rng = ChaCha8Rng::seed_from_u64(105);

    let message = Message::new_literal("", "legacy symmetric");
    let encrypted = message
        .encrypt_with_password(&mut rng, "pw", SymmetricKeyAlgorithm::CAST5, false)
        .expect("encryption");

    let decrypted = encrypted.decrypt_with_password("pw").expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"legacy symmetric".to_vec())
    );
}

#[test]
fn test_sign_verify_compressed() {
    let key = gen_rsa_key(24);
    let public = key.public_key();

    let signed = Message::new_literal("", "hello")
        .sign(&key, PASSPHRASE, HashAlgorithm::SHA2_256)
        .expect("signing");
    signed.verify(&public).expect("verifies");

    let compressed = signed
        .compress(CompressionAlgorithm::ZLIB)
        .expect("compression");
    let bytes = compressed.to_bytes().expect("serialize");

    let parsed = Message::from_bytes(&bytes).expect("parse");
    parsed.verify(&public).expect("verifies after compression");

    // flip one bit inside the compressed stream
    let mut tampered = bytes.clone();
    let idx = tampered.len() - 3;
    tampered[idx] ^= 0x10;

    let res = Message::from_bytes(&tampered).and_then(|m| m.verify(&public));
    assert!(res.is_err(), "tampered message must not verify");
}

#[test]
fn test_signed_message_armor_roundtrip() {
    let key = gen_rsa_key(25);
    let public = key.public_key();

    let signed = Message::new_literal("greeting.txt", "hello")
        .sign(&key, PASSPHRASE, HashAlgorithm::SHA2_256)
        .expect("signing");
    assert!(signed.is_one_pass_signed());

    let armored = signed.to_armored_string(None).expect("armor");
    assert!(armored.starts_with("-----BEGIN PGP MESSAGE-----"));

    let (parsed, _) = Message::from_string(&armored).expect("dearmor");
    parsed.verify(&public).expect("verifies");
    assert_eq!(parsed, signed);
}

#[test]
fn test_detached_signature() {
    let key = gen_rsa_key(26);
    let public = key.public_key();

    let config = SignatureConfig::v4(
        SignatureType::Binary,
        PublicKeyAlgorithm::RSA,
        HashAlgorithm::SHA2_256,
    );
    let signature = config.sign(&key, PASSPHRASE, b"detached data").expect("signing");
    let standalone = StandaloneSignature::new(signature);

    let armored = standalone.to_armored_string(None).expect("armor");
    assert!(armored.starts_with("-----BEGIN PGP SIGNATURE-----"));

    let (parsed, _) = StandaloneSignature::from_string(&armored).expect("dearmor");
    parsed.verify(&public, b"detached data").expect("verifies");
    assert!(parsed.verify(&public, b"detached datb").is_err());
}

#[test]
fn test_standalone_signature() {
    let key = gen_rsa_key(27);
    let public = key.public_key();

    let config = SignatureConfig::v4(
        SignatureType::Timestamp,
        PublicKeyAlgorithm::RSA,
        HashAlgorithm::SHA2_256,
    );
    let signature = config.sign_standalone(&key, PASSPHRASE).expect("signing");

    signature
        .verify_standalone(&public.primary_key)
        .expect("verifies");
}

#[test]
fn test_cleartext_roundtrip() {
    let key = gen_rsa_key(28);
    let public = key.public_key();

    let msg = CleartextSignedMessage::sign(
        "first line\n- second\n",
        &key,
        PASSPHRASE,
        HashAlgorithm::SHA2_256,
    )
    .expect("signing");

    msg.verify(&public.primary_key).expect("verifies");

    let armored = msg.to_armored_string().expect("armor");
    assert!(armored.contains("first line\n- - second\n"));

    let parsed = CleartextSignedMessage::from_string(&armored).expect("parse");
    assert_eq!(parsed.text(), "first line\n- second");
    parsed.verify(&public.primary_key).expect("verifies");

    // trailing whitespace is not part of the signed data
    let padded = CleartextSignedMessage::sign(
        "first line  \n- second\t\n",
        &key,
        PASSPHRASE,
        HashAlgorithm::SHA2_256,
    )
    .expect("signing");
    assert_eq!(padded.signed_text(), msg.signed_text());
}

#[test]
fn test_anonymous_recipient() {
    use opgp::composed::{Edata, Esk};
    use opgp::packet::{PublicKeyEncryptedSessionKey, SymEncryptedProtectedData};

    let mut rng = ChaCha8Rng::seed_from_u64(107);
    let key = gen_rsa_key(31);
    let public = key.public_key();

    let alg = SymmetricKeyAlgorithm::AES256;
    let session_key = alg.new_session_key(&mut rng);

    let esk = PublicKeyEncryptedSessionKey::from_session_key_anonymous(
        &mut rng,
        &session_key,
        alg,
        &public,
    )
    .expect("esk");
    assert!(esk.id().is_wildcard());

    let inner = Message::new_literal("", "for whom it may concern");
    let encrypted = alg
        .encrypt_protected(&mut rng, &session_key, &inner.to_bytes().expect("serialize"))
        .expect("encryption");

    let message = Message::Encrypted {
        esk: vec![Esk::PublicKeyEncryptedSessionKey(esk)],
        edata: vec![Edata::SymEncryptedProtectedData(
            SymEncryptedProtectedData::from_raw(encrypted),
        )],
    };

    // the recipient has to find the matching key by trial decryption
    let decrypted = message.decrypt(PASSPHRASE, &[&key]).expect("decryption");
    assert_eq!(
        decrypted.get_content().expect("content"),
        Some(b"for whom it may concern".to_vec())
    );
}

#[test]
fn test_multiple_recipients() {
    let mut rng = ChaCha8Rng::seed_from_u64(106);
    let alice = gen_rsa_key(29);
    let bob = gen_rsa_key(30);

    let message = Message::new_literal("", "for both of you");
    let encrypted = message
        .encrypt_to_keys(
            &mut rng,
            SymmetricKeyAlgorithm::AES256,
            &[&alice.public_key(), &bob.public_key()],
            true,
        )
        .expect("encryption");

    for key in [&alice, &bob] {
        let decrypted = encrypted.decrypt(PASSPHRASE, &[key]).expect("decryption");
        assert_eq!(
            decrypted.get_content().expect("content"),
            Some(b"for both of you".to_vec())
        );
    }
}
