pub mod bot;
pub mod chat;
pub mod config;
pub mod dispatcher;
pub mod entity;
pub mod error;
pub mod lexer;
pub mod registry;
pub mod tuling;
pub mod types;

pub use bot::run;
