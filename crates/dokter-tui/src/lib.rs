//! dokter-tui: terminal chat widgets
//!
//! Transcript bubbles, the symptom entry box, and the busy spinner, built on
//! ratatui and crossterm.

pub mod input;
pub mod theme;
pub mod widgets;

pub use input::{Action, event_to_action};
pub use theme::Theme;
