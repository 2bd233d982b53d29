//! Workspace-level behavior specs for the troupe orchestration core.
//!
//! These drive the public engine API end to end: install agents, submit
//! events, observe traces, context, cascades, and tool approvals.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cascade.rs"]
mod cascade;
#[path = "specs/context.rs"]
mod context;
#[path = "specs/durability.rs"]
mod durability;
#[path = "specs/install.rs"]
mod install;
#[path = "specs/tools.rs"]
mod tools;
