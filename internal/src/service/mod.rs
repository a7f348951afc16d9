pub mod ack_waiter;
pub mod action_orchestrator;
pub mod command_dispatcher;
pub mod control_service;
pub mod fan_out_coordinator;
pub mod toggle_controller;
