//! Persistent section/key/value storage shared by both credential stores.
//!
//! Each store is an INI file with one section per profile. Loads treat a
//! missing file as empty; saves rewrite the whole file.

pub mod profile;

pub use profile::{ParentDirs, ProfileStore, SectionRef, SectionView};
