pub mod annotation;
pub mod rules;
pub mod session;
pub mod utils;
pub mod voice;

pub use session::{Effect, GameSession, Identity, Phase};
