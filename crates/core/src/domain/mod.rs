pub mod contact;
pub mod conversation;
pub mod intake;
pub mod message;
