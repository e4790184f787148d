//! PPTX (Office Open XML) slide-deck backend.
//!
//! Opens `.pptx` packages, exposes every text shape as a translatable
//! fragment and writes the translated deck back out.

pub mod deck;
pub mod shape;
pub mod styles;
pub mod theme;

pub use deck::SlideDeck;
pub use theme::ThemeFonts;
