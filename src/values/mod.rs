mod hash;
mod item;

pub use {hash::*, item::*};
