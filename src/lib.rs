use std::fmt::Debug;
use std::hash::Hash;

pub mod config;
pub mod counter;
pub mod error;
pub mod learning;
pub mod mdp;
pub mod simulation;

pub use counter::Counter;
pub use error::{Error, Result};

/// Bounds for states, actions and features: they are used as hash map keys
/// and show up in logs.
pub trait Key: Clone + Eq + Hash + Debug {}

impl<T> Key for T where T: Clone + Eq + Hash + Debug {}
