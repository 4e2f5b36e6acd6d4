// SPDX-License-Identifier: GPL-3.0-or-later

//! The catalog core: path/source classification, the cache builder that
//! mirrors the playback daemon's library into the store, and the read
//! service the HTTP façade consumes.

pub mod builder;
pub mod provider;
pub mod responses;
pub mod service;
pub mod source;

mod direct;

pub use builder::CacheBuilder;
pub use provider::CatalogProvider;
pub use service::LibraryService;
pub use source::SourceResolver;
