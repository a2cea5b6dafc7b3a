pub mod backend;
pub mod commands;
pub mod events;
pub mod machine;
pub mod simulated;
pub mod state;

pub use backend::{MediaElement, PositionSource};
pub use commands::PlayerCommand;
pub use events::{HostEvent, MediaEvent};
pub use machine::PlaybackStateMachine;
pub use simulated::{MediaCall, SimulatedMedia};
pub use state::{PlaybackPhase, PlaybackState};
