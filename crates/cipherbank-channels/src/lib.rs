pub mod channel;
pub mod error;
pub mod stream;
pub mod types;

pub use channel::Channel;
pub use error::ChannelError;
pub use stream::StreamChatChannel;
pub use types::OutboundMessage;
