pub mod block;
pub mod md_simulation;
