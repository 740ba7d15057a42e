pub mod chat;
pub mod collections;
pub mod media;
pub mod server;
pub mod verify;
