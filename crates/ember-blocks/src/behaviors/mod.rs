pub mod actions;
pub mod conditions;
pub mod control;
pub mod events;
pub mod functions;
pub mod utility;
