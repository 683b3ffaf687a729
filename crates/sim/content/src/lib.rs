//! World construction for the simulation kernel.
//!
//! The kernel consumes a pre-generated world through the
//! [`sim_core::MapGenerator`] contract; this crate supplies the builders:
//! a symmetric skirmish map for training and demos, plus a bare arena that
//! scenario tests populate by hand. All randomness comes from the map
//! stream, so a reseeded environment regenerates the identical world.

mod skirmish;

pub use skirmish::SkirmishMap;
