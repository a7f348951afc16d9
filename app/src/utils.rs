pub mod file;
pub mod pem;
