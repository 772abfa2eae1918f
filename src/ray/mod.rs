//! This module holds the [`Ray`] definition, and ray intersection functions.
mod ray_impl;

pub use self::ray_impl::*;
