// SPDX-License-Identifier: GPL-3.0-or-later

//! Artwork provider clients: the primary album-cover source, the preferred
//! artist-image source, and the name-search fallback used for hotlinking.

pub mod coverart;
pub mod deezer;
pub mod error;
pub mod fanarttv;

pub use coverart::CoverArtClient;
pub use deezer::{DeezerArtistImage, DeezerClient};
pub use error::{FetchedImage, ProviderError};
pub use fanarttv::FanartTvClient;
