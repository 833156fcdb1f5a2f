// Mission planning module

pub mod input;
pub mod mission;

pub use input::ScriptedInput;
pub use mission::{Mission, MissionConfig, MissionEvent, MissionState, Transition};
