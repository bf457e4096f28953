pub mod physics;
pub mod collision;
pub mod pickup;
