pub mod model;
pub mod nats;
