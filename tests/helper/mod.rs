//! Shared stubs for integration tests
#![allow(dead_code)]

mod attempt;
mod pages;

pub use attempt::{ScriptedAttempt, StubReply, transport_with};
pub use pages::{StubPages, module, modules};
