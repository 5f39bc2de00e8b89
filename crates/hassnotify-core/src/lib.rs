// hassnotify-core: Location-change rules and the notifier service

pub mod error;
pub mod model;
pub mod notifier;
pub mod rules;
pub mod template;

pub use error::CoreError;
pub use model::{Household, Location, Person};
pub use notifier::Notifier;
pub use rules::{Movement, NotifierConfig, Outgoing};
pub use template::Templates;
