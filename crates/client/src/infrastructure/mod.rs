pub mod endpoint;
pub mod ws_transport;

pub use endpoint::{EndpointError, parse_endpoint, resolve_endpoint};
pub use ws_transport::WsTransport;
