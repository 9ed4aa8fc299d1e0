pub mod manager;
pub mod parser;
pub mod renderer;
pub mod source;
