pub mod action;
pub mod event;
pub mod inventory;
pub mod reactor;
pub mod state;
pub mod time;
