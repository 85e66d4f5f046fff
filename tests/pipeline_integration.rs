//! End-to-end tests for the source pipeline
//!
//! Covers the parse -> filter/transform -> write chain at the library level,
//! and a full run (fetch included) against a minimal local HTTP server.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use m3u_export::config::{Config, FilterRule, ModelConfig, SourceConfig, TransformRule};
use m3u_export::guide::filter_guide;
use m3u_export::pipeline::{self, RunSummary};
use m3u_export::playlist::{PlaylistParser, write_playlist};
use m3u_export::rules::ModelEngine;

const PLAYLIST: &str = "#EXTM3U\n\
#EXTINF:-1 tvg-id=\"1\" tvg-name=\"News\" group-title=\"Info\",News\n\
http://example/news\n\
#EXTINF:-1 tvg-id=\"2\" tvg-name=\"F1\" group-title=\"Sport\",F1\n\
http://example/f1\n";

fn model(name: &str, filters: Vec<FilterRule>, transforms: Vec<TransformRule>) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        filters,
        transforms,
    }
}

fn engine(model: &ModelConfig) -> ModelEngine {
    ModelEngine::compile(model).expect("model compiles")
}

#[test]
fn identity_model_reproduces_the_playlist() {
    let identity = engine(&model("-all", vec![], vec![]));
    let playlist = PlaylistParser::new().parse(PLAYLIST, &identity);
    assert_eq!(write_playlist(&playlist), PLAYLIST);
}

#[test]
fn round_trip_is_idempotent() {
    let identity = engine(&model("-all", vec![], vec![]));
    let parser = PlaylistParser::new();
    let once = parser.parse(PLAYLIST, &identity);
    let twice = parser.parse(&write_playlist(&once), &identity);
    assert_eq!(once.header, twice.header);
    assert_eq!(once.entries, twice.entries);
}

#[test]
fn non_matching_filter_leaves_header_only() {
    let sports_only = engine(&model(
        "-sport",
        vec![FilterRule {
            field: "group-title".to_string(),
            pattern: "Sport".to_string(),
        }],
        vec![],
    ));
    let single_entry = "#EXTM3U\n#EXTINF:-1 tvg-id=\"1\" tvg-name=\"News\" group-title=\"Info\",News\nhttp://example/news\n";
    let playlist = PlaylistParser::new().parse(single_entry, &sports_only);
    assert_eq!(write_playlist(&playlist), "#EXTM3U\n");
}

#[test]
fn transforms_apply_in_declared_order_after_filtering() {
    let renamed = engine(&model(
        "-renamed",
        vec![FilterRule {
            field: "group-title".to_string(),
            pattern: "info".to_string(),
        }],
        vec![
            TransformRule {
                field: "tvg-name".to_string(),
                pattern: "News".to_string(),
                replacement: "Headlines".to_string(),
            },
            TransformRule {
                field: "tvg-name".to_string(),
                pattern: "Headlines".to_string(),
                replacement: "World Headlines".to_string(),
            },
        ],
    ));
    let playlist = PlaylistParser::new().parse(PLAYLIST, &renamed);
    assert_eq!(playlist.entries.len(), 1);
    assert_eq!(playlist.entries[0].tvg_name(), Some("World Headlines"));
}

#[test]
fn guide_retention_follows_the_allow_list() {
    let now = Utc::now();
    let start = (now + Duration::hours(10)).format("%Y%m%d%H%M%S +0000");
    let stop = (now + Duration::hours(11)).format("%Y%m%d%H%M%S +0000");
    let doc = format!(
        "<?xml version=\"1.0\"?><tv>\
         <channel id=\"1\"><display-name>News</display-name></channel>\
         <programme channel=\"1\" start=\"{start}\" stop=\"{stop}\"><title>Show</title></programme>\
         </tv>"
    );

    let allowed: HashSet<String> = ["1".to_string()].into();
    let out = filter_guide(&doc, &allowed, now).unwrap();
    assert!(out.contains("<channel id=\"1\">"));
    assert!(out.contains("<programme"));

    let other: HashSet<String> = ["2".to_string()].into();
    let out = filter_guide(&doc, &other, now).unwrap();
    assert!(!out.contains("<channel"));
    assert!(!out.contains("<programme"));
}

/// Minimal HTTP server: answers every request with the playlist, except
/// `/guide.xml` which gets the guide document.
async fn serve(listener: TcpListener, playlist: String, guide: String) {
    loop {
        let Ok((mut socket, _)) = listener.accept().await else {
            break;
        };
        let playlist = playlist.clone();
        let guide = guide.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            loop {
                match socket.read(&mut buf[read..]).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            let request = String::from_utf8_lossy(&buf[..read]);
            let body = if request.starts_with("GET /guide.xml") {
                guide
            } else {
                playlist
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
    }
}

fn guide_doc() -> String {
    let now = Utc::now();
    let start = (now - Duration::hours(1)).format("%Y%m%d%H%M%S +0000");
    let stop = (now + Duration::hours(1)).format("%Y%m%d%H%M%S +0000");
    format!(
        "<?xml version=\"1.0\"?><tv>\
         <channel id=\"1\"><display-name>News</display-name></channel>\
         <channel id=\"2\"><display-name>F1</display-name></channel>\
         <programme channel=\"1\" start=\"{start}\" stop=\"{stop}\"><title>Now</title></programme>\
         <programme channel=\"2\" start=\"{start}\" stop=\"{stop}\"><title>Race</title></programme>\
         </tv>"
    )
}

#[tokio::test]
async fn full_run_exports_filtered_playlist_and_guide() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, PLAYLIST.to_string(), guide_doc()));

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        import_folder: dir.path().join("import"),
        export_folder: dir.path().join("export"),
        sources: vec![SourceConfig {
            name: "provider".to_string(),
            playlist: format!("http://{addr}/list.m3u"),
            guide: Some(format!("http://{addr}/guide.xml")),
            models: vec![model(
                "-news",
                vec![FilterRule {
                    field: "group-title".to_string(),
                    pattern: "info".to_string(),
                }],
                vec![],
            )],
        }],
    };

    let summary = pipeline::run(config).await;
    assert_eq!(
        summary,
        RunSummary {
            succeeded: 1,
            failed: 0
        }
    );

    // Fetched input landed in the import folder before parsing
    let fetched = std::fs::read_to_string(dir.path().join("import/provider.m3u")).unwrap();
    assert_eq!(fetched, PLAYLIST);

    let playlist_out =
        std::fs::read_to_string(dir.path().join("export/provider-news.m3u")).unwrap();
    assert!(playlist_out.contains("tvg-name=\"News\""));
    assert!(!playlist_out.contains("tvg-name=\"F1\""));

    // Guide restricted to the surviving channel's id
    let guide_out = std::fs::read_to_string(dir.path().join("export/provider.xml")).unwrap();
    assert!(guide_out.contains("<channel id=\"1\">"));
    assert!(!guide_out.contains("<channel id=\"2\">"));
    assert!(guide_out.contains("<title>Now</title>"));
    assert!(!guide_out.contains("<title>Race</title>"));
}

#[tokio::test]
async fn failing_source_does_not_block_siblings() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, PLAYLIST.to_string(), guide_doc()));

    let dir = tempfile::tempdir().unwrap();
    let good = SourceConfig {
        name: "good".to_string(),
        playlist: format!("http://{addr}/list.m3u"),
        guide: None,
        models: vec![model("-all", vec![], vec![])],
    };
    let bad = SourceConfig {
        name: "bad".to_string(),
        // Invalid filter pattern: a configuration error aborting this source
        playlist: format!("http://{addr}/list.m3u"),
        guide: None,
        models: vec![model(
            "-broken",
            vec![FilterRule {
                field: "tvg-name".to_string(),
                pattern: "([".to_string(),
            }],
            vec![],
        )],
    };
    let config = Config {
        import_folder: dir.path().join("import"),
        export_folder: dir.path().join("export"),
        sources: vec![bad, good],
    };

    let summary = pipeline::run(config).await;
    assert_eq!(
        summary,
        RunSummary {
            succeeded: 1,
            failed: 1
        }
    );
    assert!(dir.path().join("export/good-all.m3u").exists());
    assert!(!dir.path().join("export/bad-broken.m3u").exists());
}
