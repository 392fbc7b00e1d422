pub mod game_record;
pub mod hub;
pub mod messages;

// Re-export important types
pub use game_record::*;
pub use hub::SpectatorHub;
pub use messages::*;
