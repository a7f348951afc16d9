pub mod domain;
pub mod port;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;
