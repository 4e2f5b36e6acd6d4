// SPDX-License-Identifier: GPL-3.0-or-later

use anyhow::{Context, Result};
use calliope_artwork::FetchedImage;
use calliope_domain::{content_hash, Artwork, ArtworkKind};
use calliope_store::CacheStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persists fetched image bytes under the artwork tree and links the owner
/// row to the new artwork record. The file is fully written before the link
/// is made, so a reader never sees a half-written cover.
pub struct ArtworkSaver {
    store: CacheStore,
    cache_dir: PathBuf,
}

impl ArtworkSaver {
    pub fn new(store: CacheStore, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_dir: cache_dir.into(),
        }
    }

    pub async fn save_album_art(
        &self,
        album_id: &str,
        image: &FetchedImage,
        provider: &str,
    ) -> Result<Artwork> {
        let path = self
            .write_image(Path::new("artwork").join("albums"), album_id, image)
            .await?;
        let mut artwork = Artwork::local(album_id, ArtworkKind::Album, path, provider);
        fill_metadata(&mut artwork, image);
        self.store.link_album_artwork(album_id, &artwork).await?;
        debug!(
            target: "enrichment",
            album_id,
            provider,
            bytes = image.bytes.len(),
            "album art saved"
        );
        Ok(artwork)
    }

    pub async fn save_artist_art(
        &self,
        artist_id: &str,
        image: &FetchedImage,
        provider: &str,
    ) -> Result<Artwork> {
        let path = self
            .write_image(Path::new("artwork").join("artists"), artist_id, image)
            .await?;
        let mut artwork = Artwork::local(artist_id, ArtworkKind::Artist, path, provider);
        fill_metadata(&mut artwork, image);
        self.store.link_artist_artwork(artist_id, &artwork).await?;
        debug!(
            target: "enrichment",
            artist_id,
            provider,
            bytes = image.bytes.len(),
            "artist art saved"
        );
        Ok(artwork)
    }

    async fn write_image(
        &self,
        subdir: PathBuf,
        owner_id: &str,
        image: &FetchedImage,
    ) -> Result<String> {
        let dir = self.cache_dir.join(subdir);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;

        let file_name = format!("{}.{}", owner_id, extension_for(&image.mime_type));
        let path = dir.join(file_name);
        tokio::fs::write(&path, &image.bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn fill_metadata(artwork: &mut Artwork, image: &FetchedImage) {
    artwork.mime_type = Some(image.mime_type.clone());
    artwork.byte_size = Some(image.bytes.len() as i64);
    artwork.content_hash = Some(content_hash(&image.bytes));
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "img",
    }
}
