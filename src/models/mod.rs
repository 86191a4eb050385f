pub mod event;
pub mod order;
