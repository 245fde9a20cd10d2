//! Read only queries about what this build of the library supports.

/// Major version of the library
pub fn version_major() -> u32 {
    parse_version_part(env!("CARGO_PKG_VERSION_MAJOR"))
}

/// Minor version of the library
pub fn version_minor() -> u32 {
    parse_version_part(env!("CARGO_PKG_VERSION_MINOR"))
}

/// Patch version of the library
pub fn version_revision() -> u32 {
    parse_version_part(env!("CARGO_PKG_VERSION_PATCH"))
}

/// Whether the digest based handshake used by Flash Player 9 and later can be performed
pub fn complex_handshake_supported() -> bool {
    true
}

/// RTMPS is not supported, TLS has to be layered on by the caller's transport
pub fn ssl_enabled() -> bool {
    false
}

fn parse_version_part(part: &str) -> u32 {
    part.parse().unwrap_or(0)
}
