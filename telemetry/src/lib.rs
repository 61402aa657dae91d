pub mod events;
pub mod subscriber;

pub use subscriber::init_tracing;
pub use valuable;
