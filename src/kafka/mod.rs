pub mod admin;
pub mod config;
pub mod consumer;
pub mod producer;

#[cfg(test)]
pub mod memory;
