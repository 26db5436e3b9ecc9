pub mod account_repository;
pub mod message_repository;

pub use account_repository::AccountRepository;
pub use message_repository::MessageRepository;
