//! Program advisor — Telegram bot helping applicants choose between the
//! two ITMO AI master's programs.

pub mod advisor;
pub mod channels;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod recommend;
pub mod scraper;
pub mod store;
pub mod survey;
