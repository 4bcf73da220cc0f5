//! The training-step controller and its external collaborator seam.

pub mod engine;
pub mod step_controller;

#[cfg(test)]
mod tests;

pub use engine::UpdateEngine;
pub use step_controller::TrainingStepController;
