//! Resolution of `rtmp://host[:port]/app[/...]/stream` urls into the pieces a session needs.

use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 1935;

#[derive(Debug, Error)]
pub enum RtmpUrlError {
    #[error("The url could not be parsed: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("Url scheme '{scheme}' is not supported, only rtmp urls are")]
    UnsupportedScheme { scheme: String },

    #[error("The url does not contain a host")]
    MissingHost,

    #[error("The url does not contain an application name")]
    MissingApp,
}

/// The target of an RTMP session.
///
/// The last path segment is the stream name and everything before it is the application, so
/// `rtmp://example.com/live/_definst_/cam1` has an app of `live/_definst_`.  A url with a single
/// path segment only names an application.  A query string stays attached to the stream name,
/// since servers commonly read authentication tokens from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtmpUrl {
    pub host: String,
    pub port: u16,
    pub app: String,
    pub stream: Option<String>,
}

impl RtmpUrl {
    pub fn parse(input: &str) -> Result<RtmpUrl, RtmpUrlError> {
        let url = Url::parse(input)?;
        if url.scheme() != "rtmp" {
            return Err(RtmpUrlError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(RtmpUrlError::MissingHost),
        };

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|x| !x.is_empty()).collect())
            .unwrap_or_else(Vec::new);

        let stream = match segments.len() {
            0 => return Err(RtmpUrlError::MissingApp),
            1 => None,
            _ => segments.pop().map(|name| match url.query() {
                Some(query) => format!("{}?{}", name, query),
                None => name.to_string(),
            }),
        };

        Ok(RtmpUrl {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            app: segments.join("/"),
            stream,
        })
    }

    /// The `tcUrl` value for the connect request.  The port is left out when it's the default.
    pub fn tc_url(&self) -> String {
        if self.port == DEFAULT_PORT {
            format!("rtmp://{}/{}", self.host, self.app)
        } else {
            format!("rtmp://{}:{}/{}", self.host, self.port, self.app)
        }
    }
}
