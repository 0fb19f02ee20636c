//! The concrete single-run environment over any [`StateStore`](crate::backend::StateStore).

pub mod environment;
mod reset;
mod step;

pub use environment::{Environment, Phase};
