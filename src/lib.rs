pub mod analysis;
pub mod gui;
pub mod logging;
pub mod settings;
pub mod state;
pub mod tree;
pub mod vault;
pub mod workers;
