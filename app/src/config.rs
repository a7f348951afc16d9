pub mod app_config;
pub mod control_config;
pub mod nats_config;
pub mod postgres_config;
