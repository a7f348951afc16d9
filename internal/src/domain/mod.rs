pub mod audit;
pub mod command;
pub mod error;
pub mod outcome;
pub mod request;
pub mod settings;
pub mod toggle;
