//! EduBot terminal client
//!
//! A chat front end for the EduBot study assistant. The crate is split into:
//!
//! - [`conversation`]: the message log, turn-taking and request lifecycle
//! - [`api`]: the HTTP client for the answering service
//! - [`ui`]: the ratatui interface, including the input composer
//! - [`config`] and [`logging`]: ambient setup shared by every entry point

pub mod api;
pub mod config;
pub mod conversation;
pub mod events;
pub mod logging;
pub mod ui;
