pub mod event;
pub mod reply;
