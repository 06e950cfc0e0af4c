pub mod account;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod notify;
