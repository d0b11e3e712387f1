use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Endpoint has no host: {0}")]
    MissingHost(String),
}

/// Derive the feed endpoint from the origin the client is served from.
///
/// `https` origins get `wss`, `http` origins get `ws`; the host and port
/// are kept and the path is replaced.
pub fn resolve_endpoint(origin: &str, path: &str) -> Result<Url, EndpointError> {
    let mut url = to_socket_url(Url::parse(origin)?)?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Parse an explicit endpoint, mapping `http(s)` onto `ws(s)`
pub fn parse_endpoint(endpoint: &str) -> Result<Url, EndpointError> {
    to_socket_url(Url::parse(endpoint)?)
}

fn to_socket_url(mut url: Url) -> Result<Url, EndpointError> {
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
    };
    if url.host_str().is_none() {
        return Err(EndpointError::MissingHost(url.to_string()));
    }
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(EndpointError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}
