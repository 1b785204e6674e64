#![forbid(unsafe_code)]

//! Maven Cache Doctor (mcd): finds and removes corrupted artifacts from a
//! local Maven repository.
//!
//! Two kinds of damage are detected:
//! 1. **Broken archives**: `.jar` files that are empty, truncated or not a zip
//!    container at all.
//! 2. **Proxy error pages**: `.pom` files that hold an HTML login or error page
//!    instead of a project descriptor.
//!
//! # Library usage
//!
//! The [`api`] module is the simplest entry point:
//!
//! ```rust,no_run
//! let repo = maven_cache_doctor::api::resolve_repository_path()?;
//! let broken = maven_cache_doctor::api::scan(&repo)?;
//! let locations: Vec<_> = broken.iter().map(|a| a.location()).collect();
//! let result = maven_cache_doctor::api::clean(&locations);
//! println!("deleted {}", result.deleted_count);
//! # Ok::<(), maven_cache_doctor::core::errors::McdError>(())
//! ```
//!
//! The [`prelude`] re-exports the component types for finer control.

pub mod prelude;

pub mod api;
pub mod core;
pub mod logger;
pub mod resolver;
pub mod scanner;
