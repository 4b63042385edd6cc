//! Direct interaction with the X server

pub(crate) mod atoms;
pub(crate) mod connection;
pub(crate) mod input;
pub(crate) mod keymap;
pub(crate) mod property;
