//! # Sinks Module
//!
//! Concrete feedback collaborators for the terminal front end.

pub mod buzzer;
pub mod display;
pub mod lights;
