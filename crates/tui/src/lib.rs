//! # Flowdesk TUI Library
//!
//! Terminal client for Flowdesk built on Ratatui. It lists ticket templates
//! with a preview of each workflow, fills step forms with live validation,
//! draws the dependency graph, and talks to the template assistant whose
//! suggestions become unsaved drafts.
//!
//! ## Architecture
//!
//! Screens are components that mutate `App` and return effects. The
//! runtime executes effects, spawning API calls whose outcomes come back as
//! messages, and streams assistant replies into the chat session.

mod app;
mod cmd;
pub mod logging;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use flowdesk_api::AppContext;
use flowdesk_util::LocalStore;

/// Runs the interactive client until the user quits.
///
/// # Errors
///
/// Fails when the terminal cannot be put into raw mode or drawn to.
pub async fn run(ctx: Arc<AppContext>, store: Arc<dyn LocalStore>) -> Result<()> {
    ui::runtime::run_app(ctx, store).await
}
