/*!
The client side of the RTMP handshake.

The handshake is sans-IO: `Handshake` only turns inbound bytes into outbound bytes, it never
touches a socket.  The exchange is:

1. The client sends C0 (the version byte, always 3) and C1 (1536 bytes: time, four zero or
   version bytes, and 1528 bytes of random data).
2. The server answers with S0, S1 and S2.
3. Once all three are received the client sends C2 and the handshake is complete.

In `HandshakeMode::Complex` C1 carries a digest and S1's digest is verified through a
`HandshakeDigest` implementation.  A failed digest check, or any S0 other than 3, puts the
handshake in a terminal failed state without producing C2.

```
use rcl_rtmp::handshake::{Handshake, HandshakeMode, HandshakeProcessResult};

let mut handshake = Handshake::new(HandshakeMode::Simple);
let c0_and_c1 = handshake.generate_outbound_c0_and_c1().unwrap();
assert_eq!(c0_and_c1.len(), 1537);

// A server that echoes our C1 back as S2
let mut server_bytes = vec![3_u8];
server_bytes.extend_from_slice(&[0_u8; 1536]);
server_bytes.extend_from_slice(&c0_and_c1[1..]);

match handshake.process_bytes(&server_bytes).unwrap() {
    HandshakeProcessResult::Completed { response_bytes, remaining_bytes } => {
        assert_eq!(response_bytes.len(), 1536);
        assert!(remaining_bytes.is_empty());
    }

    HandshakeProcessResult::InProgress { .. } => panic!("Handshake should have completed"),
}
```
*/

mod digest;
mod errors;

pub use self::digest::{HandshakeDigest, HmacSha256Digest, DIGEST_SIZE};
pub use self::errors::HandshakeError;

use byteorder::{BigEndian, WriteBytesExt};
use log::debug;
use rand::Rng;

/// The only RTMP version in use
pub const RTMP_VERSION: u8 = 3;

/// Size of C1, C2, S1 and S2
pub const PACKET_SIZE: usize = 1536;

/// Value for the second 4 bytes of a complex C1, advertised as the Flash Player version
const COMPLEX_C1_VERSION: u32 = 0x8000_0702;

/// Which handshake flavor the client performs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeMode {
    /// Plain handshake with random data and no verification
    Simple,

    /// Digest bearing handshake as performed by Flash Player 9 and later
    Complex,
}

/// The result of processing bytes received from the server
#[derive(Debug, PartialEq)]
pub enum HandshakeProcessResult {
    /// The handshake needs more bytes from the server.  Any response bytes must be sent.
    InProgress { response_bytes: Vec<u8> },

    /// The handshake has completed.  `response_bytes` (C2) must still be sent to the server, and
    /// any bytes received past the end of S2 belong to the chunk stream.
    Completed {
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
    },
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Stage {
    NeedToSendC0AndC1,
    WaitingForS0,
    WaitingForS1,
    WaitingForS2,
    Complete,
    Failed,
}

/// Performs the client side of the RTMP handshake
pub struct Handshake {
    mode: HandshakeMode,
    digest: Box<dyn HandshakeDigest>,
    my_epoch: u32,
    current_stage: Stage,
    c1: Vec<u8>,
    s1: Vec<u8>,
    s1_digest: Option<[u8; DIGEST_SIZE]>,
    buffer: Vec<u8>,
}

impl Handshake {
    /// Creates a handshake that uses HMAC-SHA256 for complex digests
    pub fn new(mode: HandshakeMode) -> Handshake {
        Handshake::with_digest(mode, Box::new(HmacSha256Digest))
    }

    /// Creates a handshake with a custom digest implementation
    pub fn with_digest(mode: HandshakeMode, digest: Box<dyn HandshakeDigest>) -> Handshake {
        Handshake {
            mode,
            digest,
            my_epoch: 0,
            current_stage: Stage::NeedToSendC0AndC1,
            c1: Vec::new(),
            s1: Vec::new(),
            s1_digest: None,
            buffer: Vec::with_capacity(1 + PACKET_SIZE * 2),
        }
    }

    pub fn mode(&self) -> HandshakeMode {
        self.mode
    }

    pub fn is_completed(&self) -> bool {
        self.current_stage == Stage::Complete
    }

    pub fn is_failed(&self) -> bool {
        self.current_stage == Stage::Failed
    }

    /// The number of bytes that must still be received before the next server packet can be
    /// processed.  This is zero once the handshake is no longer waiting on the server.
    pub fn bytes_needed(&self) -> usize {
        let packet_length = match self.current_stage {
            Stage::WaitingForS0 => 1,
            Stage::WaitingForS1 | Stage::WaitingForS2 => PACKET_SIZE,
            _ => return 0,
        };

        packet_length.saturating_sub(self.buffer.len())
    }

    /// Creates the C0 and C1 packets that start the handshake
    pub fn generate_outbound_c0_and_c1(&mut self) -> Result<Vec<u8>, HandshakeError> {
        match self.current_stage {
            Stage::NeedToSendC0AndC1 => (),
            Stage::Failed => return Err(HandshakeError::HandshakeAlreadyFailed),
            _ => return Err(HandshakeError::HandshakeAlreadyCompleted),
        }

        let result = self.create_c1();
        let c1 = match result {
            Ok(c1) => c1,
            Err(error) => return Err(self.fail(error)),
        };

        let mut bytes = Vec::with_capacity(1 + PACKET_SIZE);
        bytes.push(RTMP_VERSION);
        bytes.extend_from_slice(&c1);

        self.c1 = c1;
        self.current_stage = Stage::WaitingForS0;
        Ok(bytes)
    }

    /// Processes bytes received from the server.
    ///
    /// If C0 and C1 have not been generated yet they are generated first and returned as part of
    /// the response.
    pub fn process_bytes(&mut self, data: &[u8]) -> Result<HandshakeProcessResult, HandshakeError> {
        let mut response_bytes = Vec::new();
        match self.current_stage {
            Stage::NeedToSendC0AndC1 => response_bytes = self.generate_outbound_c0_and_c1()?,
            Stage::Complete => return Err(HandshakeError::HandshakeAlreadyCompleted),
            Stage::Failed => return Err(HandshakeError::HandshakeAlreadyFailed),
            _ => (),
        }

        self.buffer.extend_from_slice(data);

        loop {
            let starting_stage = self.current_stage;
            let result = match self.current_stage {
                Stage::WaitingForS0 => self.parse_s0(),
                Stage::WaitingForS1 => self.parse_s1(),
                Stage::WaitingForS2 => self.parse_s2(),
                _ => Ok(None),
            };

            match result {
                Ok(Some(c2)) => response_bytes.extend(c2),
                Ok(None) => (),
                Err(error) => return Err(self.fail(error)),
            }

            if self.current_stage == Stage::Complete || starting_stage == self.current_stage {
                // Either done, or not enough bytes to process the current packet
                break;
            }
        }

        if self.current_stage == Stage::Complete {
            let remaining_bytes = self.buffer.drain(..).collect();
            Ok(HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            })
        } else {
            Ok(HandshakeProcessResult::InProgress { response_bytes })
        }
    }

    fn create_c1(&self) -> Result<Vec<u8>, HandshakeError> {
        let mut c1 = Vec::with_capacity(PACKET_SIZE);
        c1.write_u32::<BigEndian>(self.my_epoch)?;

        let version = match self.mode {
            HandshakeMode::Simple => 0,
            HandshakeMode::Complex => COMPLEX_C1_VERSION,
        };

        c1.write_u32::<BigEndian>(version)?;
        c1.extend_from_slice(&create_random_data(PACKET_SIZE - 8));

        if self.mode == HandshakeMode::Complex {
            self.digest.sign_c1(&mut c1)?;
        }

        Ok(c1)
    }

    fn parse_s0(&mut self) -> Result<Option<Vec<u8>>, HandshakeError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match self.buffer.remove(0) {
            RTMP_VERSION => {
                self.current_stage = Stage::WaitingForS1;
                Ok(None)
            }

            version => Err(HandshakeError::BadVersionId { version }),
        }
    }

    fn parse_s1(&mut self) -> Result<Option<Vec<u8>>, HandshakeError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(None);
        }

        let s1: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();
        if self.mode == HandshakeMode::Complex {
            self.s1_digest = Some(self.digest.validate_s1(&s1)?);
        }

        self.s1 = s1;
        self.current_stage = Stage::WaitingForS2;
        Ok(None)
    }

    fn parse_s2(&mut self) -> Result<Option<Vec<u8>>, HandshakeError> {
        if self.buffer.len() < PACKET_SIZE {
            return Ok(None);
        }

        let s2: Vec<u8> = self.buffer.drain(..PACKET_SIZE).collect();

        // Servers are inconsistent about what S2 contains, so it is never a failure
        if self.mode == HandshakeMode::Simple && s2[8..] != self.c1[8..] {
            debug!("S2 did not echo the random data of C1");
        }

        let c2 = self.create_c2()?;
        self.current_stage = Stage::Complete;
        Ok(Some(c2))
    }

    fn create_c2(&self) -> Result<Vec<u8>, HandshakeError> {
        match self.s1_digest {
            None => Ok(self.s1.clone()),
            Some(s1_digest) => {
                let mut c2 = create_random_data(PACKET_SIZE);
                self.digest.sign_c2(&s1_digest, &mut c2)?;
                Ok(c2)
            }
        }
    }

    fn fail(&mut self, error: HandshakeError) -> HandshakeError {
        debug!("Handshake failed: {}", error);
        self.current_stage = Stage::Failed;
        self.buffer.clear();
        error
    }
}

fn create_random_data(length: usize) -> Vec<u8> {
    let mut random_data = vec![0_u8; length];
    rand::thread_rng().fill(&mut random_data[..]);
    random_data
}

#[cfg(test)]
mod tests {
    use super::digest::tests::signed_s1;
    use super::digest::DigestLayout;
    use super::*;
    use byteorder::{BigEndian, ReadBytesExt};
    use hmac::{Hmac, Mac, NewMac};
    use sha2::Sha256;
    use std::io::Cursor;

    fn server_response(s1: &[u8], s2: &[u8]) -> Vec<u8> {
        let mut bytes = vec![3_u8];
        bytes.extend_from_slice(s1);
        bytes.extend_from_slice(s2);
        bytes
    }

    #[test]
    fn simple_c0_and_c1_are_version_time_zeros_and_random_data() {
        let mut handshake = Handshake::new(HandshakeMode::Simple);
        let data = handshake.generate_outbound_c0_and_c1().unwrap();

        assert_eq!(data.len(), 1537);

        let mut cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 3, "Unexpected version");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0, "Unexpected time");
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), 0, "Unexpected zeros");
        assert!(data[9..].iter().any(|x| *x != 0), "Random data was all zeros");
    }

    #[test]
    fn random_data_is_different_for_every_handshake() {
        let data1 = Handshake::new(HandshakeMode::Simple)
            .generate_outbound_c0_and_c1()
            .unwrap();

        let data2 = Handshake::new(HandshakeMode::Simple)
            .generate_outbound_c0_and_c1()
            .unwrap();

        assert_ne!(&data1[9..], &data2[9..]);
    }

    #[test]
    fn simple_handshake_sends_s1_back_as_c2() {
        let mut handshake = Handshake::new(HandshakeMode::Simple);
        let c0_and_c1 = handshake.generate_outbound_c0_and_c1().unwrap();

        let s1 = vec![9_u8; PACKET_SIZE];
        let mut input = server_response(&s1, &c0_and_c1[1..]);
        input.extend_from_slice(&[1, 2, 3]);

        match handshake.process_bytes(&input).unwrap() {
            HandshakeProcessResult::Completed {
                response_bytes,
                remaining_bytes,
            } => {
                assert_eq!(response_bytes, s1);
                assert_eq!(remaining_bytes, vec![1, 2, 3]);
            }

            x => panic!("Expected Completed, got {:?}", x),
        }

        assert!(handshake.is_completed());
    }

    #[test]
    fn c2_is_only_produced_once_s2_arrives() {
        let mut handshake = Handshake::new(HandshakeMode::Simple);
        let c0_and_c1 = handshake.generate_outbound_c0_and_c1().unwrap();
        assert_eq!(handshake.bytes_needed(), 1);

        let input = server_response(&[5_u8; PACKET_SIZE], &c0_and_c1[1..]);

        let result = handshake.process_bytes(&input[..1000]).unwrap();
        assert_eq!(result, HandshakeProcessResult::InProgress { response_bytes: Vec::new() });
        assert_eq!(handshake.bytes_needed(), PACKET_SIZE - 999);

        let result = handshake.process_bytes(&input[1000..2000]).unwrap();
        assert_eq!(result, HandshakeProcessResult::InProgress { response_bytes: Vec::new() });

        match handshake.process_bytes(&input[2000..]).unwrap() {
            HandshakeProcessResult::Completed { response_bytes, .. } => {
                assert_eq!(response_bytes.len(), PACKET_SIZE)
            }

            x => panic!("Expected Completed, got {:?}", x),
        }
    }

    #[test]
    fn process_bytes_generates_c0_and_c1_when_not_yet_sent() {
        let mut handshake = Handshake::new(HandshakeMode::Simple);
        match handshake.process_bytes(&[]).unwrap() {
            HandshakeProcessResult::InProgress { response_bytes } => {
                assert_eq!(response_bytes.len(), 1537);
                assert_eq!(response_bytes[0], 3);
            }

            x => panic!("Expected InProgress, got {:?}", x),
        }
    }

    #[test]
    fn bad_s0_fails_without_producing_c2() {
        let mut handshake = Handshake::new(HandshakeMode::Simple);
        let _ = handshake.generate_outbound_c0_and_c1().unwrap();

        let mut input = vec![6_u8];
        input.extend_from_slice(&[0_u8; PACKET_SIZE * 2]);

        match handshake.process_bytes(&input) {
            Err(HandshakeError::BadVersionId { version: 6 }) => (),
            x => panic!("Expected BadVersionId, got {:?}", x),
        }

        assert!(handshake.is_failed());
        match handshake.process_bytes(&[3]) {
            Err(HandshakeError::HandshakeAlreadyFailed) => (),
            x => panic!("Expected HandshakeAlreadyFailed, got {:?}", x),
        }
    }

    #[test]
    fn complex_c1_carries_version_and_digest() {
        let mut handshake = Handshake::new(HandshakeMode::Complex);
        let data = handshake.generate_outbound_c0_and_c1().unwrap();

        let mut cursor = Cursor::new(&data[1..]);
        let _ = cursor.read_u32::<BigEndian>().unwrap();
        assert_eq!(cursor.read_u32::<BigEndian>().unwrap(), COMPLEX_C1_VERSION);

        let c1 = &data[1..];
        let offset = DigestLayout::DigestFirst.digest_offset(c1);
        let expected = digest::packet_digest(c1, offset, b"Genuine Adobe Flash Player 001").unwrap();
        assert_eq!(&c1[offset..offset + DIGEST_SIZE], &expected[..]);
    }

    #[test]
    fn complex_handshake_signs_c2_with_s1_digest() {
        let mut handshake = Handshake::new(HandshakeMode::Complex);
        let _ = handshake.generate_outbound_c0_and_c1().unwrap();

        let s1 = signed_s1(DigestLayout::KeyFirst);
        let offset = DigestLayout::KeyFirst.digest_offset(&s1);
        let s1_digest = s1[offset..offset + DIGEST_SIZE].to_vec();

        let input = server_response(&s1, &[0_u8; PACKET_SIZE]);
        let c2 = match handshake.process_bytes(&input).unwrap() {
            HandshakeProcessResult::Completed { response_bytes, .. } => response_bytes,
            x => panic!("Expected Completed, got {:?}", x),
        };

        let mut fp_key = b"Genuine Adobe Flash Player 001".to_vec();
        fp_key.extend_from_slice(&[
            0xF0, 0xEE, 0xC2, 0x4A, 0x80, 0x68, 0xBE, 0xE8, 0x2E, 0x00, 0xD0, 0xD1, 0x02, 0x9E,
            0x7E, 0x57, 0x6E, 0xEC, 0x5D, 0x2D, 0x29, 0x80, 0x6F, 0xAB, 0x93, 0xB8, 0xE6, 0x36,
            0xCF, 0xEB, 0x31, 0xAE,
        ]);

        let mut mac = Hmac::<Sha256>::new_varkey(&fp_key).unwrap();
        mac.update(&s1_digest);
        let key = mac.finalize().into_bytes();

        let mut mac = Hmac::<Sha256>::new_varkey(&key).unwrap();
        mac.update(&c2[..PACKET_SIZE - DIGEST_SIZE]);
        mac.verify(&c2[PACKET_SIZE - DIGEST_SIZE..]).unwrap();
    }

    #[test]
    fn complex_handshake_with_invalid_s1_digest_fails() {
        let mut handshake = Handshake::new(HandshakeMode::Complex);
        let _ = handshake.generate_outbound_c0_and_c1().unwrap();

        let input = server_response(&[7_u8; PACKET_SIZE], &[0_u8; PACKET_SIZE]);
        match handshake.process_bytes(&input) {
            Err(HandshakeError::InvalidPeerDigest) => (),
            x => panic!("Expected InvalidPeerDigest, got {:?}", x),
        }

        assert!(handshake.is_failed());
    }

    struct AcceptAllDigest;

    impl HandshakeDigest for AcceptAllDigest {
        fn sign_c1(&self, _c1: &mut [u8]) -> Result<(), HandshakeError> {
            Ok(())
        }

        fn validate_s1(&self, _s1: &[u8]) -> Result<[u8; DIGEST_SIZE], HandshakeError> {
            Ok([1_u8; DIGEST_SIZE])
        }

        fn sign_c2(&self, _s1_digest: &[u8], c2: &mut [u8]) -> Result<(), HandshakeError> {
            for byte in c2.iter_mut() {
                *byte = 0xAB;
            }

            Ok(())
        }
    }

    #[test]
    fn custom_digest_is_used_for_complex_handshake() {
        let mut handshake = Handshake::with_digest(HandshakeMode::Complex, Box::new(AcceptAllDigest));
        let _ = handshake.generate_outbound_c0_and_c1().unwrap();

        let input = server_response(&[7_u8; PACKET_SIZE], &[0_u8; PACKET_SIZE]);
        match handshake.process_bytes(&input).unwrap() {
            HandshakeProcessResult::Completed { response_bytes, .. } => {
                assert_eq!(response_bytes, vec![0xAB; PACKET_SIZE]);
            }

            x => panic!("Expected Completed, got {:?}", x),
        }
    }
}
