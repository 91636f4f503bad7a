pub mod extract;
pub mod refresh;
pub mod tokens;
