pub mod adjudication;
pub mod deadline;
pub mod engine;
pub mod events;
