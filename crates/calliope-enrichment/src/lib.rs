// SPDX-License-Identifier: GPL-3.0-or-later

//! The web-metadata enrichment pipeline: seeding missing-artwork jobs,
//! saving fetched images, and the background worker that drains the queue
//! through the provider fallback chain.

pub mod coordinator;
pub mod providers;
pub mod saver;
pub mod worker;

pub use coordinator::EnrichmentCoordinator;
pub use providers::{AlbumArtSource, ArtistImageSearch, ArtistImageSource, IdentifierService};
pub use saver::ArtworkSaver;
pub use worker::{EnrichmentWorker, WorkerConfig};
