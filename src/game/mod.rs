pub mod constants;
pub mod state;
pub mod systems;
pub mod grid;
pub mod game_loop;
