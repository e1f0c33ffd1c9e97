//! Protective state management.

pub mod defense;
