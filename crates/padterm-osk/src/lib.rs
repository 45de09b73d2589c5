#![forbid(unsafe_code)]

//! On-screen keyboard logical model.
//!
//! `padterm-osk` turns controller actions into the byte sequences a real
//! keyboard would produce. It owns:
//!
//! - **Layered character layouts** (`.kb` files): up to 16 layers keyed by
//!   a modifier bitmask, with whole-row and single-key fallback to the base
//!   layer.
//! - **Special key sets** (`.keys` files): named, dynamically loadable
//!   collections of keys, fronted by the built-in `CONTROL` set whose tail
//!   is a self-modifying load/unload menu.
//! - **The selection and emission engine**: one-shot vs held modifier
//!   discipline, layer-switch consumption, macro expansion, and internal
//!   commands surfaced to the embedder.
//!
//! Rendering is out of scope; [`Osk::view`] exposes everything a renderer
//! needs, and a generation counter tells it when cached key artwork is
//! stale.

pub mod key;
pub mod keyset;
pub mod layout;
pub mod model;

pub use key::{KeyAction, OskCommand, OskKey};
pub use keyset::SpecialKeySet;
pub use layout::{CharLayout, KeyRow, LayoutRow};
pub use model::{
    ActionOutcome, Osk, OskAction, OskMode, OskView, PositionMode, NUM_CONTROL_ACTION_KEYS,
};
