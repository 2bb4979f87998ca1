pub mod chronik;
pub mod config;
pub mod decoder;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod tokens;
pub mod wallet;
