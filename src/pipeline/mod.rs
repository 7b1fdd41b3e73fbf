//! Audio pipeline components.
//!
//! The pipeline decouples the producer's cadence from the device's:
//!
//! ```text
//! Producer Step → Input Ring → Rate Controller → Output Ring → CPAL Callback
//! ```
//!
//! - **Ring Buffer**: bounded FIFO absorbing cadence mismatch; silence
//!   on underrun, truncation on overflow
//! - **Moving Average**: smooths call-to-call jitter in chunk size
//! - **Rate Controller**: the per-chunk feedback loop retuning the
//!   resampling ratio from queue-occupancy feedback
//!
//! Only the output ring crosses the thread boundary; its lock is held
//! strictly around individual queue operations so the real-time
//! callback is never blocked.

mod mavg;
mod rate_control;
mod ring_buffer;

pub use mavg::{MovingAverage, MAVG_WINDOW};
pub use rate_control::RateController;
pub use ring_buffer::RingBuffer;
