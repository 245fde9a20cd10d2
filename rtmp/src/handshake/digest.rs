//! Digest handling for the complex (Flash Player 9+) handshake.
//!
//! In a complex handshake C1 and S1 carry a 32 byte HMAC-SHA256 digest somewhere inside their
//! random region.  Where it lives depends on one of two layouts, each of which derives the
//! digest's offset from four bytes of the packet itself.  C2 ends with a digest keyed off of the
//! digest found in S1.

use super::errors::HandshakeError;
use super::PACKET_SIZE;
use hmac::{Hmac, Mac, NewMac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DIGEST_SIZE: usize = 32;

const GENUINE_FP_KEY: [u8; 62] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'P', b'l', b'a', b'y', b'e', b'r', b' ', b'0', b'0', b'1',
    0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E,
    0x57, 0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB,
    0x31, 0xAE,
];

const GENUINE_FMS_KEY: [u8; 68] = [
    b'G', b'e', b'n', b'u', b'i', b'n', b'e', b' ', b'A', b'd', b'o', b'b', b'e', b' ', b'F',
    b'l', b'a', b's', b'h', b' ', b'M', b'e', b'd', b'i', b'a', b' ', b'S', b'e', b'r', b'v',
    b'e', b'r', b' ', b'0', b'0', b'1', 0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E,
    0x00, 0xD0, 0xD1, 0x02, 0x9E, 0x7E, 0x57, 0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB,
    0x93, 0xB8, 0xE6, 0x36, 0xCF, 0xEB, 0x31, 0xAE,
];

/// Only the textual part of each key is used for C1 and S1 digests
const GENUINE_FP_KEY_TEXT_LENGTH: usize = 30;
const GENUINE_FMS_KEY_TEXT_LENGTH: usize = 36;

/// The two places a digest can be located in a handshake packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigestLayout {
    /// Key block first, digest block second (offset bytes at 772..776)
    KeyFirst,

    /// Digest block first, key block second (offset bytes at 8..12)
    DigestFirst,
}

impl DigestLayout {
    pub fn digest_offset(self, packet: &[u8]) -> usize {
        let (offset_start, base) = match self {
            DigestLayout::DigestFirst => (8, 12),
            DigestLayout::KeyFirst => (772, 776),
        };

        let sum: usize = packet[offset_start..offset_start + 4]
            .iter()
            .map(|x| *x as usize)
            .sum();

        (sum % 728) + base
    }
}

/// The digest operations of a complex handshake.
///
/// The default implementation is `HmacSha256Digest`.  Applications that need to interoperate
/// with a server using a different digest scheme can provide their own.
pub trait HandshakeDigest: Send {
    /// Embeds the client digest into a fully formed C1 packet
    fn sign_c1(&self, c1: &mut [u8]) -> Result<(), HandshakeError>;

    /// Locates and verifies the server digest in S1, returning it
    fn validate_s1(&self, s1: &[u8]) -> Result<[u8; DIGEST_SIZE], HandshakeError>;

    /// Writes the trailing signature of C2, based on the digest returned by `validate_s1()`
    fn sign_c2(&self, s1_digest: &[u8], c2: &mut [u8]) -> Result<(), HandshakeError>;
}

/// HMAC-SHA256 digests using the well known Flash Player and Flash Media Server keys
#[derive(Clone, Copy, Debug, Default)]
pub struct HmacSha256Digest;

impl HandshakeDigest for HmacSha256Digest {
    fn sign_c1(&self, c1: &mut [u8]) -> Result<(), HandshakeError> {
        let offset = DigestLayout::DigestFirst.digest_offset(c1);
        let digest = packet_digest(c1, offset, &GENUINE_FP_KEY[..GENUINE_FP_KEY_TEXT_LENGTH])?;
        c1[offset..offset + DIGEST_SIZE].copy_from_slice(&digest);

        Ok(())
    }

    fn validate_s1(&self, s1: &[u8]) -> Result<[u8; DIGEST_SIZE], HandshakeError> {
        if s1.len() != PACKET_SIZE {
            return Err(HandshakeError::InvalidPeerDigest);
        }

        let key = &GENUINE_FMS_KEY[..GENUINE_FMS_KEY_TEXT_LENGTH];
        for layout in [DigestLayout::DigestFirst, DigestLayout::KeyFirst].iter() {
            let offset = layout.digest_offset(s1);
            let embedded = &s1[offset..offset + DIGEST_SIZE];

            let mut mac = keyed_mac(key)?;
            mac.update(&s1[..offset]);
            mac.update(&s1[offset + DIGEST_SIZE..]);
            if mac.verify(embedded).is_ok() {
                let mut digest = [0_u8; DIGEST_SIZE];
                digest.copy_from_slice(embedded);
                return Ok(digest);
            }
        }

        Err(HandshakeError::InvalidPeerDigest)
    }

    fn sign_c2(&self, s1_digest: &[u8], c2: &mut [u8]) -> Result<(), HandshakeError> {
        let signature_start = c2.len() - DIGEST_SIZE;
        let key = hmac_sha256(&GENUINE_FP_KEY, s1_digest)?;
        let signature = hmac_sha256(&key, &c2[..signature_start])?;
        c2[signature_start..].copy_from_slice(&signature);

        Ok(())
    }
}

/// Computes the digest of a packet with the 32 digest bytes at `offset` left out
pub fn packet_digest(
    packet: &[u8],
    offset: usize,
    key: &[u8],
) -> Result<[u8; DIGEST_SIZE], HandshakeError> {
    let mut mac = keyed_mac(key)?;
    mac.update(&packet[..offset]);
    mac.update(&packet[offset + DIGEST_SIZE..]);

    Ok(into_digest(mac))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; DIGEST_SIZE], HandshakeError> {
    let mut mac = keyed_mac(key)?;
    mac.update(data);

    Ok(into_digest(mac))
}

fn keyed_mac(key: &[u8]) -> Result<HmacSha256, HandshakeError> {
    HmacSha256::new_varkey(key).map_err(|_| HandshakeError::DigestKeyRejected)
}

fn into_digest(mac: HmacSha256) -> [u8; DIGEST_SIZE] {
    let mut digest = [0_u8; DIGEST_SIZE];
    digest.copy_from_slice(&mac.finalize().into_bytes());
    digest
}
