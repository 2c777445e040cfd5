pub mod health;
pub mod news;
pub mod notification_hub;
pub mod rbmq;
