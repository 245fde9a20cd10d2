//! A blocking RTMP client.
//!
//! The protocol pieces (`handshake`, `chunk_io`, `messages`) never perform I/O themselves, they
//! turn bytes into values and values into bytes.  `sessions::ClientSession` drives them over a
//! `Read + Write` transport to publish or play a stream.

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod capabilities;
pub mod chunk_io;
pub mod handshake;
pub mod messages;
pub mod rtmp_url;
pub mod sessions;
pub mod time;
