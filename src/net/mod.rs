pub mod framing;
pub mod game_session;
pub mod observer;
pub mod protocol;
