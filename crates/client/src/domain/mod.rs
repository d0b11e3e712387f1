pub mod connection;
pub mod events;
pub mod frame;
pub mod traits;

pub use connection::{Availability, ConnectionState, ConnectionStatus};
pub use events::{ClientRequest, FeedEvent, FeedNotice, TopicData};
pub use frame::{EnvelopeFrame, Frame, UnifiedFrame};
pub use traits::{FeedTransport, TransportLink, TransportMessage};
