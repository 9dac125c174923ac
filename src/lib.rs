pub mod focus;
pub mod gui;
pub mod input;
pub mod keymap;
pub mod logging;
pub mod overlay;
pub mod repeat;
pub mod settings;
pub mod visibility;
