//! Terminal front end for the `olaf` engine.
//!
//! The binary resolves [`config::Settings`], installs logging, opens the
//! on-disk store and hands control to [`runtime::ChatLoop`].

pub mod avatar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod providers;
pub mod runtime;
pub mod view;
