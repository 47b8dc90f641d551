pub mod engine;
pub mod message;
pub mod queue;

pub use engine::{Broker, dead_letter_queue, lock};
pub use message::{Delivery, QueuedMessage};
pub use queue::{QueueInfo, QueueOptions};
