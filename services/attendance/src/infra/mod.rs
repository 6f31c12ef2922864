pub mod db;
pub mod mailer;
pub mod memory;
pub mod outbox;
pub mod store;
pub mod sweeper;
