pub mod vec2;
pub mod periodic;
