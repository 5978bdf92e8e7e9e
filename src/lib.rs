pub mod gui;
pub mod launch;
pub mod logging;
pub mod overlay;
pub mod settings;
pub mod store;
