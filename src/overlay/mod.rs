pub mod manager;
pub mod messages;
pub mod pager;
pub mod view;
pub mod window;

pub use manager::{runtime, set_launch_hook, set_overlay_spawn_hook, OverlayManager, PresentOutcome};
pub use window::OverlayWindow;

use thiserror::Error;

/// Errors surfaced to the host when bringing the overlay up. `NotPermitted`
/// is recoverable: the host prompts the user to grant the overlay permission
/// and may simply call `present` again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("system refused the always-on-top overlay window")]
    NotPermitted,
    #[error("overlay failed to start: {0}")]
    Startup(String),
    /// Another `present` call is still mid window creation; retry shortly.
    #[error("an overlay window is already being created")]
    Busy,
}
