pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod gateway;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod shell;

#[cfg(test)]
mod tests;
