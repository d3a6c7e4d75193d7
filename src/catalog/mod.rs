//! Persistent film catalogue: an explicit storage handle plus get-or-create
//! helpers for the auxiliary entities (genres, people, languages).

pub mod counts;
pub mod db;
pub mod ensure;

pub use db::Db;
pub use ensure::{ensure_genre, ensure_language, ensure_person, resolve_names, slugify, AuxKind};
