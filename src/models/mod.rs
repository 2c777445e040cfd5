pub mod health;
pub mod hub;
pub mod job;
pub mod message;
pub mod news;
