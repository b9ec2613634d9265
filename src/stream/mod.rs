//! Stream Multiplexer.
//!
//! One long-lived outbound event sequence per connection, merging
//! asynchronously completed responses with heartbeats.

mod correlator;
mod event;
mod multiplexer;

pub use correlator::Correlator;
pub use event::{Framing, StreamEvent};
pub use multiplexer::{Multiplexer, Phase, StreamOptions};
