//! Messaging adapters
//!
//! JSON envelopes, the outbound channel publisher and the inbound lesson
//! event consumer.

pub mod consumer;
pub mod envelope;
pub mod publisher;

pub use consumer::{LessonEventConsumer, LESSON_CONSUMER_ID};
pub use envelope::Envelope;
pub use publisher::ChannelPublisher;
