//! A protocol engine for building X11 window managers
//!
//! [`Session::open`] connects to the display, claims substructure
//! redirection on the root window, grabs the configured keybindings, and
//! starts a dispatch loop on a background thread. The embedding program
//! receives [`Notifications`] over per-category channels and acts on
//! [`Window`] handles; policy (layout, focus rules, bindings' meanings)
//! stays entirely on its side.
//!
//! ```no_run
//! use wmcore::{Config, ModMask, Session, Stroke};
//!
//! fn main() -> Result<(), wmcore::Error> {
//!     let config = Config::new(vec![Stroke::new(&[ModMask::Mod4], u32::from('q'))]);
//!     let session = Session::open(config)?;
//!
//!     for stroke in &session.events.strokes {
//!         println!("stroke: {}", stroke);
//!         break;
//!     }
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

#![deny(
    clippy::all,
    clippy::complexity,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    bad_style,
    ellipsis_inclusive_range_patterns,
    exported_private_dependencies,
    ill_formed_attribute_input,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_abi,
    no_mangle_generic_items,
    non_shorthand_field_patterns,
    noop_method_call,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    semicolon_in_expressions_from_macros,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    while_true
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod config;
mod error;
mod events;
mod geometry;
pub mod keysym;
mod window;
mod wm;
mod x;

pub use config::Config;
pub use error::Error;
pub use events::{Notifications, ResizeRequest};
pub use geometry::{Dimension, Point, Rectangle};
pub use window::{Window, Xid};
pub use wm::Session;
pub use x::input::{ModMask, Stroke};
