//! Telegram control panel letting a trainer keep a catalog of muscle groups
//! and exercises, and link a client-facing bot.

pub mod client_bot;
pub mod config;
pub mod db;
pub mod fsm;
pub mod handlers;
pub mod keyboards;
pub mod model;
pub mod router;
