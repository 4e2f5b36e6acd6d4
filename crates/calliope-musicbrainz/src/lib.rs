// SPDX-License-Identifier: GPL-3.0-or-later

//! Client for the identifier service: resolves `(artist, album)` and
//! `(artist)` pairs to the external ids the artwork providers accept.

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

#[cfg(test)]
mod client_tests;

pub use client::{MusicBrainzClient, MusicBrainzClientBuilder};
pub use error::{MusicBrainzError, Result};
pub use models::{ArtistMatch, ReleaseMatch, SearchQuery};
pub use rate_limiter::{RateLimiter, WaitCancelled};
