use log::debug;

use crate::composed::signed_key::{SignedKeyDetails, SignedPublicSubKey, SignedSecretSubKey};
use crate::composed::signed_key::{SignedUser, SignedUserAttribute};
use crate::errors::{Error, Result};
use crate::packet::{self, Packet, PacketTrait, Signature, SignatureType, UserAttribute, UserId};
use crate::types::{KeyTrait, Tag};

/// Parse one key block from the packet stream, following the transferable
/// key grammar:
///
/// ```text
/// Key          ::= Primary PrimaryCerts (UIDBlock | UATBlock)* SubkeyBlock*
/// PrimaryCerts ::= Signature*
/// UIDBlock     ::= UserID Signature*
/// UATBlock     ::= UserAttribute Signature*
/// SubkeyBlock  ::= Subkey Signature+
/// ```
///
/// Ref: <https://tools.ietf.org/html/rfc4880.html#section-11.1>
#[allow(clippy::complexity)]
pub fn next<I, IKT>(
    packets: &mut std::iter::Peekable<I>,
    key_tag: Tag,
    parse_secret_subkeys: bool,
) -> Option<
    Result<(
        IKT,
        SignedKeyDetails,
        Vec<SignedPublicSubKey>,
        Vec<SignedSecretSubKey>,
    )>,
>
where
    I: Sized + Iterator<Item = Result<Packet>>,
    IKT: TryFrom<Packet, Error = Error> + KeyTrait,
{
    let packets = packets.by_ref();

    // Check if we are done
    packets.peek()?;

    macro_rules! err_opt {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(e) => return Some(Err(e)),
            }
        };
    }

    // -- One Public-Key packet

    let next = match packets.next() {
        Some(Ok(n)) => n,
        Some(Err(e)) => return Some(Err(e)),
        None => return None,
    };

    if next.tag() != key_tag {
        return Some(Err(format_err!(
            "grammar violation: expected a {:?} packet, got {:?}",
            key_tag,
            next.tag()
        )));
    }

    let primary_key: IKT = err_opt!(next.try_into());
    debug!("primary key: {:?}", primary_key.key_id());

    // -- Zero or more revocation signatures
    // -- followed by zero or more direct signatures
    debug!("  signatures");
    let mut revocation_signatures = Vec::new();
    let mut direct_signatures = Vec::new();

    while let Some(res) = packets.next_if(|p| p.as_ref().is_ok_and(|p| p.tag() == Tag::Signature)) {
        let packet = err_opt!(res);
        let sig: Signature = err_opt!(packet.try_into());

        if sig.typ() == SignatureType::KeyRevocation {
            revocation_signatures.push(sig);
        } else {
            direct_signatures.push(sig);
        }
    }

    // -- Zero or more User ID packets
    // -- Zero or more User Attribute packets
    debug!("  users");
    let mut users = Vec::new();
    let mut user_attributes = Vec::new();

    while let Some(res) = packets.next_if(|p| {
        p.as_ref()
            .is_ok_and(|p| p.tag() == Tag::UserId || p.tag() == Tag::UserAttribute)
    }) {
        let packet = err_opt!(res);

        match packet.tag() {
            Tag::UserId => {
                let id: UserId = err_opt!(packet.try_into());

                // --- zero or more signature packets
                let mut sigs = Vec::new();
                while let Some(res) =
                    packets.next_if(|p| p.as_ref().is_ok_and(|p| p.tag() == Tag::Signature))
                {
                    let packet = err_opt!(res);
                    sigs.push(err_opt!(packet.try_into()));
                }

                users.push(SignedUser::new(id, sigs));
            }
            Tag::UserAttribute => {
                let attr: UserAttribute = err_opt!(packet.try_into());

                // --- zero or more signature packets
                let mut sigs = Vec::new();
                while let Some(res) =
                    packets.next_if(|p| p.as_ref().is_ok_and(|p| p.tag() == Tag::Signature))
                {
                    let packet = err_opt!(res);
                    sigs.push(err_opt!(packet.try_into()));
                }

                user_attributes.push(SignedUserAttribute::new(attr, sigs));
            }
            _ => unreachable!(),
        }
    }

    // -- Zero or more Subkey packets
    debug!("  subkeys");
    let mut public_subkeys = Vec::new();
    let mut secret_subkeys = Vec::new();

    while let Some(res) = packets.next_if(|p| {
        p.as_ref().is_ok_and(|p| {
            p.tag() == Tag::PublicSubkey || (parse_secret_subkeys && p.tag() == Tag::SecretSubkey)
        })
    }) {
        let packet = err_opt!(res);

        match packet.tag() {
            Tag::PublicSubkey => {
                let subkey: packet::PublicSubkey = err_opt!(packet.try_into());

                let mut sigs = Vec::new();
                while let Some(res) =
                    packets.next_if(|p| p.as_ref().is_ok_and(|p| p.tag() == Tag::Signature))
                {
                    let packet = err_opt!(res);
                    sigs.push(err_opt!(packet.try_into()));
                }

                public_subkeys.push(SignedPublicSubKey::new(subkey, sigs));
            }
            Tag::SecretSubkey => {
                let subkey: packet::SecretSubkey = err_opt!(packet.try_into());

                let mut sigs = Vec::new();
                while let Some(res) =
                    packets.next_if(|p| p.as_ref().is_ok_and(|p| p.tag() == Tag::Signature))
                {
                    let packet = err_opt!(res);
                    sigs.push(err_opt!(packet.try_into()));
                }

                secret_subkeys.push(SignedSecretSubKey::new(subkey, sigs));
            }
            _ => unreachable!(),
        }
    }

    // A following packet that is not the start of the next key is a grammar
    // violation.
    if let Some(res) = packets.next_if(|p| {
        p.as_ref()
            .is_ok_and(|p| p.tag() != Tag::PublicKey && p.tag() != Tag::SecretKey)
    }) {
        let packet = err_opt!(res);
        return Some(Err(format_err!(
            "grammar violation: unexpected packet {:?}",
            packet.tag()
        )));
    }

    // Does peeking forward yield an error? If so, this key is broken.
    if let Some(Err(e)) = packets.next_if(|p| p.is_err()) {
        return Some(Err(e));
    }

    Some(Ok((
        primary_key,
        SignedKeyDetails::new(
            revocation_signatures,
            direct_signatures,
            users,
            user_attributes,
        ),
        public_subkeys,
        secret_subkeys,
    )))
}
