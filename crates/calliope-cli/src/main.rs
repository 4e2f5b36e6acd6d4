// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use calliope_artwork::{CoverArtClient, DeezerClient, FanartTvClient};
use calliope_config::AppConfig;
use calliope_enrichment::{
    ArtistImageSearch, ArtistImageSource, ArtworkSaver, EnrichmentCoordinator, EnrichmentWorker,
    IdentifierService, WorkerConfig,
};
use calliope_library::{LibraryService, SourceResolver};
use calliope_mpd::MpdClient;
use calliope_musicbrainz::MusicBrainzClient;
use calliope_store::CacheStore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = calliope_config::load(config_path.as_deref())?;

    let store = CacheStore::open(&config.database.data_dir).await?;
    let provider = Arc::new(MpdClient::new(
        config.daemon.host.clone(),
        config.daemon.port,
    ));
    let classifier = Arc::new(SourceResolver::new(
        &config.daemon.music_root,
        &config.library.mounts_path,
    ));

    let service = LibraryService::new(
        provider.clone(),
        classifier,
        Some(store.clone()),
        config.library.base_paths.clone(),
    );

    let status = service.cache_status().await;
    info!(
        target: "cli",
        albums = status.albums,
        artists = status.artists,
        "library cache opened"
    );
    if status.albums == 0 {
        info!(target: "cli", "cache is empty; running initial build");
        if let Err(error) = service.rebuild_cache().await {
            warn!(target: "cli", %error, "initial cache build failed; reads fall back to the daemon");
        }
    }

    let shutdown = CancellationToken::new();
    let worker_handle = start_enrichment(&config, &store, shutdown.clone())?;

    shutdown_signal().await;
    shutdown.cancel();
    if let Some(handle) = worker_handle {
        let _ = handle.await;
    }
    info!(target: "cli", "shutdown complete");
    Ok(())
}

/// Wire up the enrichment pipeline: identifier client, artwork providers,
/// coordinator seeding, and the background worker.
fn start_enrichment(
    config: &AppConfig,
    store: &CacheStore,
    shutdown: CancellationToken,
) -> Result<Option<tokio::task::JoinHandle<()>>> {
    let enrichment = &config.enrichment;

    let mut musicbrainz = MusicBrainzClient::builder();
    if let Some(base) = &enrichment.musicbrainz_base_url {
        musicbrainz = musicbrainz.base_url(base.clone());
    }
    let identifier: Arc<dyn IdentifierService> = Arc::new(musicbrainz.build()?);

    let album_art = Arc::new(CoverArtClient::new(enrichment.coverart_base_url.clone())?);

    let artist_images: Option<Arc<dyn ArtistImageSource>> =
        match enrichment.fanarttv.api_key.clone() {
            Some(api_key) => Some(Arc::new(FanartTvClient::new(
                api_key,
                enrichment.fanarttv.base_url.clone(),
            )?)),
            None => {
                info!(target: "cli", "no fanart.tv api key; artist images use fallbacks only");
                None
            }
        };
    let artist_search: Option<Arc<dyn ArtistImageSearch>> =
        Some(Arc::new(DeezerClient::new(enrichment.deezer.base_url.clone())?));

    let saver = Arc::new(ArtworkSaver::new(
        store.clone(),
        Path::new(&config.database.data_dir),
    ));

    let coordinator = Arc::new(EnrichmentCoordinator::new(store.clone(), identifier));
    {
        let coordinator = coordinator.clone();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            if let Err(error) = coordinator.queue_missing_artwork(&cancel).await {
                warn!(target: "cli", %error, "album art seeding stopped");
            }
            if let Err(error) = coordinator.queue_missing_artist_images(&cancel).await {
                warn!(target: "cli", %error, "artist image seeding stopped");
            }
        });
    }

    let worker = Arc::new(EnrichmentWorker::new(
        store.clone(),
        saver,
        album_art,
        artist_images,
        artist_search,
        WorkerConfig {
            tick_interval: std::time::Duration::from_secs(enrichment.tick_interval_secs.max(1)),
            batch_size: enrichment.batch_size.max(1),
        },
    ));
    Ok(Some(worker.run(shutdown)))
}

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    #[cfg(not(unix))]
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    {
        interrupt.await.expect("ctrl_c handler");
    }

    info!(target: "cli", "shutdown signal received");
}
