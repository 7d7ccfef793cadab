pub mod compute;
pub mod start;
