pub mod observer;
pub mod probe;
pub mod restore;
pub mod tracker;
pub mod window_ref;
