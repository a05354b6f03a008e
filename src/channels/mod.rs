//! Message channels — how users talk to the advisor.

pub mod channel;
pub mod telegram;

pub use channel::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
pub use telegram::TelegramChannel;
