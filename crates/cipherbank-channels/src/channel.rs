use async_trait::async_trait;

use crate::{error::ChannelError, types::OutboundMessage};

/// Outbound side of a chat channel.
///
/// Implementations must be `Send + Sync` so one adapter can be shared by
/// every in-flight webhook request.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"stream"`).
    fn name(&self) -> &str;

    /// Deliver a single message. One round trip, no retry.
    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;
}
