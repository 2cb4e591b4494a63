pub mod api;
pub mod campaign;
pub mod chat;
