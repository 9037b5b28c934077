//! Arena data structures specialized for the wasmbox module and engine
//! representations.
//!
//! These cannot deallocate single entities; every index handed out stays
//! valid for the arena's lifetime. That tradeoff is what lets `FuncIdx`,
//! `TypeIdx`, and friends be plain `u32` newtypes instead of reference-counted
//! handles.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod arena;

pub use arena::{Arena, ArenaIndex, Iter, IterMut};
