pub mod clock;
pub mod collaborators;
pub mod controller;
pub mod event;
pub mod sequencer;
pub mod session;
