//! The HTTP front for the CECI bot-chain pipeline: three routes (`/chat`,
//! `/chat/sync`, `/health`), config loading, and the CLI surface. The
//! per-turn algorithm itself lives in `ceci_planner`; this crate only
//! wires it to Axum.

pub mod api;
pub mod cli;
pub mod state;
