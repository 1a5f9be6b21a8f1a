//! TUI Components

mod input;

pub use input::InputBox;
