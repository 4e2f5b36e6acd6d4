use calliope_library::provider::CatalogProvider;
use calliope_mpd::MpdClient;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Minimal daemon stand-in: answers the handshake, then serves one canned
/// response per incoming command line.
async fn spawn_daemon(responses: Vec<(&'static str, &'static str)>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let responses = responses.clone();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                reader
                    .get_mut()
                    .write_all(b"OK MPD 0.23.5\n")
                    .await
                    .expect("banner");

                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                let command = line.trim_end();
                let body = responses
                    .iter()
                    .find(|(prefix, _)| command.starts_with(prefix))
                    .map(|(_, body)| *body)
                    .unwrap_or("ACK [5@0] {} unknown command\n");
                reader
                    .get_mut()
                    .write_all(body.as_bytes())
                    .await
                    .expect("response");
            });
        }
    });

    port
}

#[tokio::test]
async fn test_album_details_aggregates_songs() {
    let port = spawn_daemon(vec![(
        "find base \"INTERNAL\"",
        "file: INTERNAL/Band/Album/01.flac\n\
         Album: Album\n\
         AlbumArtist: Band\n\
         Date: 2003\n\
         duration: 181.5\n\
         file: INTERNAL/Band/Album/02.flac\n\
         Album: Album\n\
         AlbumArtist: Band\n\
         Time: 212\n\
         OK\n",
    )])
    .await;

    let client = MpdClient::new("127.0.0.1", port);
    let albums = client.album_details("INTERNAL").await.expect("details");

    assert_eq!(albums.len(), 1);
    let album = &albums[0];
    assert_eq!(album.get("album").map(String::as_str), Some("Album"));
    assert_eq!(album.get("albumartist").map(String::as_str), Some("Band"));
    assert_eq!(
        album.get("firsttrack").map(String::as_str),
        Some("INTERNAL/Band/Album/01.flac")
    );
    assert_eq!(album.get("trackcount").map(String::as_str), Some("2"));
    assert_eq!(album.get("totaltime").map(String::as_str), Some("394"));
    assert_eq!(album.get("year").map(String::as_str), Some("2003"));
}

#[tokio::test]
async fn test_artist_album_counts() {
    let port = spawn_daemon(vec![(
        "list album group albumartist",
        "AlbumArtist: Band A\n\
         Album: One\n\
         Album: Two\n\
         AlbumArtist: Band B\n\
         Album: Three\n\
         OK\n",
    )])
    .await;

    let client = MpdClient::new("127.0.0.1", port);
    let counts = client.artist_album_counts().await.expect("counts");
    assert_eq!(counts.get("Band A"), Some(&2));
    assert_eq!(counts.get("Band B"), Some(&1));
}

#[tokio::test]
async fn test_playlists_and_info() {
    let port = spawn_daemon(vec![
        (
            "listplaylists",
            "playlist: Radio/FIP\n\
             Last-Modified: 2024-01-01T00:00:00Z\n\
             playlist: Favourites\n\
             OK\n",
        ),
        (
            "listplaylistinfo \"Radio/FIP\"",
            "file: http://stream/fip\n\
             Title: FIP\n\
             OK\n",
        ),
    ])
    .await;

    let client = MpdClient::new("127.0.0.1", port);
    let playlists = client.playlists().await.expect("playlists");
    assert_eq!(playlists, vec!["Radio/FIP", "Favourites"]);

    let rows = client.playlist_info("Radio/FIP").await.expect("info");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("file").map(String::as_str),
        Some("http://stream/fip")
    );
}

#[tokio::test]
async fn test_ack_surfaces_as_error() {
    let port = spawn_daemon(vec![]).await;

    let client = MpdClient::new("127.0.0.1", port);
    let result = client.playlists().await;
    assert!(result.is_err());
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("unknown command"), "got: {}", message);
}

#[tokio::test]
async fn test_album_tracks_sends_quoted_filter() {
    // quote_filter_value escapes the apostrophe, quote_arg doubles the
    // backslash it introduced
    let port = spawn_daemon(vec![(
        "find \"((album == 'Don\\\\'t Stop') AND (albumartist == 'Band'))\"",
        "file: INTERNAL/Band/Dont Stop/01.flac\n\
         Title: Opener\n\
         Track: 1\n\
         OK\n",
    )])
    .await;

    let client = MpdClient::new("127.0.0.1", port);
    let rows = client.album_tracks("Don't Stop", "Band").await.expect("tracks");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("title").map(String::as_str), Some("Opener"));
}
