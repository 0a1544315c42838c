//! `hexlamp` drives a hexagonal RGBW LED panel: it synthesizes animated frames on a rectangular
//! grid, maps them onto the physically wired LEDs and pushes them to the strip at a fixed rate,
//! while a control server changes the lamp parameters.

#[macro_use]
extern crate tracing;

pub mod animations;
pub mod color;
pub mod control;
pub mod lamp;
pub mod mapping;
pub mod models;
pub mod packer;
pub mod servers;
pub mod surface;
