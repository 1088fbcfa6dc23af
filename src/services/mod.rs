pub mod notifier;

pub use notifier::{CallbackNotifier, DeliveryReport};
