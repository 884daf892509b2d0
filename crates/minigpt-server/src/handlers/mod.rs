pub mod chat;
pub mod meta;
