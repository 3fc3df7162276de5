//! Tintcut Project - project state
//!
//! Implements the data the editor works on:
//! - Projects holding imported media and the active selection
//! - A snapshot store shared by every component
//! - A library of saved projects keyed by name
//! - Versioned project files

pub mod library;
pub mod project;
pub mod serialization;
pub mod store;

pub use library::ProjectLibrary;
pub use project::{Project, Selection};
pub use serialization::ProjectFile;
pub use store::{MediaLists, ProjectStore};
