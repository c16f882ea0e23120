//! Processing module for turning raw input into timeline actions
//!
//! This module contains the action tracker state machine and the frame
//! quantization applied to every emitted timestamp.

pub mod action;
pub mod frames;
pub mod tracker;

pub use action::{Action, ActionKind};
pub use frames::FrameRate;
pub use tracker::ActionTracker;
