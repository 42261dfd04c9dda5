//! Playlist API client integration tests
//!
//! Run with: cargo test -p integration-tests --test playlist_tests

use herald_bot::{VideoSource, YoutubeClient, YoutubeError};
use integration_tests::TestServer;

const API_KEY: &str = "yt-key";

#[tokio::test]
async fn test_playlist_owner_lookup() {
    let server = TestServer::start().await.unwrap();
    let client = YoutubeClient::new(server.youtube_base(), API_KEY);

    assert_eq!(client.playlist_owner("PL1").await.unwrap().as_deref(), Some("UC1"));
    assert_eq!(client.playlist_owner("PLmissing").await.unwrap(), None);

    let queries = server.playlist_queries();
    let (resource, query) = &queries[0];
    assert_eq!(resource, "playlists");
    assert_eq!(query["part"], "snippet");
    assert_eq!(query["id"], "PL1");
    assert_eq!(query["maxResults"], "1");
    assert_eq!(query["key"], API_KEY);
}

#[tokio::test]
async fn test_uploads_page_request() {
    let server = TestServer::start().await.unwrap();
    let client = YoutubeClient::new(server.youtube_base(), API_KEY);

    let page = client.playlist_items_page("UU1", Some("page-1")).await.unwrap();
    assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    assert_eq!(page.items[0].video_id(), "abc123");

    let queries = server.playlist_queries();
    let (resource, query) = &queries[0];
    assert_eq!(resource, "playlistItems");
    assert_eq!(query["playlistId"], "UU1");
    assert_eq!(query["maxResults"], "25");
    assert_eq!(query["pageToken"], "page-1");
}

#[tokio::test]
async fn test_video_lookup_filters_by_video() {
    let server = TestServer::start().await.unwrap();
    let client = YoutubeClient::new(server.youtube_base(), API_KEY);

    let item = client.find_in_playlist("PL1", "abc123").await.unwrap().unwrap();
    assert_eq!(item.snippet.video_owner_channel_title.as_deref(), Some("Rocket Lab"));

    let queries = server.playlist_queries();
    let (_, query) = &queries[0];
    assert_eq!(query["videoId"], "abc123");
    assert_eq!(query["maxResults"], "50");
}

#[tokio::test]
async fn test_error_envelope_is_api_error() {
    let server = TestServer::start().await.unwrap();
    let client = YoutubeClient::new(server.youtube_base(), API_KEY);

    let err = client.playlist_items_page("UUbroken", None).await.unwrap_err();
    assert!(matches!(
        err,
        YoutubeError::Api { code: 403, ref message } if message == "quotaExceeded"
    ));
}
