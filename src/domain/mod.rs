pub mod forwarding_address;

pub use forwarding_address::{Completion, ForwardingAddress, ForwardingStatus, TransitionError};
