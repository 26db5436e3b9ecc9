pub mod account;
pub mod message;

pub use account::{Account, CreateAccountRequest};
pub use message::Message;
