//! Outbound audit notifications

pub mod emitter;
pub mod ports;

pub use emitter::{into_publish_error, ActionLogEmitter};
pub use ports::{ActionLogPublisher, LessonLockPublisher};
