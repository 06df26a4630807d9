// ABOUTME: Root module for reagent - a ReAct agent runtime with tool dispatch,
// ABOUTME: run tracing, and evaluation. Re-exports all public types from submodules.

pub mod agent;
pub mod config;
pub mod error;
pub mod eval;
pub mod llm;
pub mod prelude;
pub mod service;
pub mod tool;
pub mod tools;
pub mod trace;

pub use error::ReagentError;
