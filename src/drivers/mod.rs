//! Hardware initialisation.

pub mod hw_init;
