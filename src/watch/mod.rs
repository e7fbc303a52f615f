//! Background watchers feeding the controller

pub mod activity;
pub mod focus;
pub mod shortcut;

pub use activity::KeyActivityWatcher;
pub use focus::FocusWatcher;
pub use shortcut::ShortcutWatcher;
