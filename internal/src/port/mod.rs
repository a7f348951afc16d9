pub mod audit;
pub mod channel;
pub mod control;
