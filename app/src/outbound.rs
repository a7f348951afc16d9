pub mod nats_channel;
pub mod postgres;
