//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and drive full
//! crawl sessions end-to-end, observing the engine only through its events.

use driftnet::crawler::{CrawlSnapshot, DomainFilter};
use driftnet::{Channel, CrawlError, CrawlEvent, Crawler, CrawlerConfig, DisallowReason, EngineState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One observed event, reduced to what the assertions need
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    channel: Channel,
    url: Option<String>,
    reason: Option<DisallowReason>,
    status: Option<u16>,
}

type Recorder = Arc<Mutex<Vec<Seen>>>;

fn create_test_config() -> CrawlerConfig {
    CrawlerConfig {
        delay: 0,
        request_timeout: 2000,
        honor_bot_rules: true,
        only_follow_sitemap: true,
    }
}

/// Subscribes a recorder to every channel
fn record(crawler: &Crawler) -> Recorder {
    let seen: Recorder = Arc::new(Mutex::new(Vec::new()));
    for channel in Channel::ALL {
        let sink = Arc::clone(&seen);
        crawler.on(channel, move |event| {
            let reason = match event {
                CrawlEvent::DisallowUrl { reason, .. } => Some(*reason),
                _ => None,
            };
            let status = match event {
                CrawlEvent::Fetch { status, .. } => Some(*status),
                CrawlEvent::Error {
                    error: CrawlError::HttpStatus { status, .. },
                    ..
                } => Some(*status),
                _ => None,
            };
            sink.lock().unwrap().push(Seen {
                channel: event.channel(),
                url: event.url().map(str::to_string),
                reason,
                status,
            });
        });
    }
    seen
}

fn channels(seen: &Recorder) -> Vec<Channel> {
    seen.lock().unwrap().iter().map(|s| s.channel).collect()
}

fn urls_on(seen: &Recorder, channel: Channel) -> Vec<String> {
    seen.lock()
        .unwrap()
        .iter()
        .filter(|s| s.channel == channel)
        .filter_map(|s| s.url.clone())
        .collect()
}

fn count(seen: &Recorder, channel: Channel) -> usize {
    channels(seen).iter().filter(|c| **c == channel).count()
}

async fn wait_for(seen: &Recorder, channel: Channel, n: usize) {
    for _ in 0..500 {
        if count(seen, channel) >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for {} {} events", n, channel);
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html")
}

async fn mount_robots(server: &MockServer, robots: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(robots))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_robots_warns_then_fetches_seed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><head><title>Home</title></head><body></body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let seen = record(&crawler);

    let seed = format!("{}/", server.uri());
    crawler.start(Some(seed.as_str())).await.unwrap();

    let order = channels(&seen);
    let warn = order.iter().position(|c| *c == Channel::Warn).expect("warn event");
    let fetch = order.iter().position(|c| *c == Channel::Fetch).expect("fetch event");
    assert!(warn < fetch);

    assert_eq!(order.first(), Some(&Channel::Start));
    assert_eq!(order.last(), Some(&Channel::Finish));
    assert_eq!(urls_on(&seen, Channel::Fetch), vec![seed.clone()]);
    assert_eq!(urls_on(&seen, Channel::AfterCrawl), vec![seed]);
    // Both fallback sitemaps are missing
    assert_eq!(count(&seen, Channel::Error), 2);
    assert_eq!(crawler.state(), EngineState::Idle);
}

#[tokio::test]
async fn test_disallowed_seed_is_never_fetched() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let seen = record(&crawler);

    let seed = format!("{}/private/page", server.uri());
    crawler.start(Some(seed.as_str())).await.unwrap();

    assert_eq!(count(&seen, Channel::Fetch), 0);
    assert_eq!(count(&seen, Channel::BeforeCrawl), 0);
    let disallowed: Vec<Seen> = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.channel == Channel::DisallowUrl)
        .cloned()
        .collect();
    assert_eq!(disallowed.len(), 1);
    assert_eq!(disallowed[0].url.as_deref(), Some(seed.as_str()));
    assert_eq!(disallowed[0].reason, Some(DisallowReason::BotRules));
    assert_eq!(count(&seen, Channel::Finish), 1);
}

#[tokio::test]
async fn test_bot_rules_can_be_ignored() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /").await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        honor_bot_rules: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);

    let seed = format!("{}/page", server.uri());
    crawler.start(Some(seed.as_str())).await.unwrap();

    assert_eq!(count(&seen, Channel::DisallowUrl), 0);
    assert_eq!(count(&seen, Channel::AfterCrawl), 1);
}

#[tokio::test]
async fn test_only_follow_sitemap_ignores_page_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, &format!("User-agent: *\nAllow: /\nSitemap: {}/list.txt", base)).await;
    Mock::given(method("GET"))
        .and(path("/list.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("{}/a\n", base)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/b">B</a></body></html>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    assert_eq!(
        urls_on(&seen, Channel::Fetch),
        vec![format!("{}/", base), format!("{}/a", base)]
    );
    assert_eq!(count(&seen, Channel::Warn), 0);
    assert_eq!(count(&seen, Channel::Error), 0);

    let host = url::Url::parse(&base).unwrap();
    let key = format!("{}:{}", host.host_str().unwrap(), host.port().unwrap());
    let domain = crawler.domain_config(&key).expect("cached domain config");
    assert_eq!(domain.sitemap_urls, vec![format!("{}/list.txt", base)]);
}

#[tokio::test]
async fn test_only_follow_sitemap_follows_links_without_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/b">B</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    assert!(crawler.config().only_follow_sitemap);
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    assert_eq!(
        urls_on(&seen, Channel::AfterCrawl),
        vec![format!("{}/", base), format!("{}/b", base)]
    );
    // robots.txt, sitemap.xml and sitemap.txt are all missing
    assert_eq!(count(&seen, Channel::Warn), 1);
    assert_eq!(count(&seen, Channel::Error), 2);
    assert_eq!(crawler.visited_len(), 2);

    let host = url::Url::parse(&base).unwrap();
    let key = format!("{}:{}", host.host_str().unwrap(), host.port().unwrap());
    assert!(!crawler.domain_config(&key).unwrap().has_sitemap());
}

#[tokio::test]
async fn test_links_and_stylesheet_references_are_followed() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><link rel="stylesheet" href="/style.css"></head>
            <body><a href="docs/intro#top">Intro</a><a href="mailto:me@example.com">Mail</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"body { background: url('/bg.png'); }".to_vec(), "text/css"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(html("<html><title>Intro</title></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bg.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    let fetched = urls_on(&seen, Channel::Fetch);
    assert!(fetched.contains(&format!("{}/style.css", base)));
    assert!(fetched.contains(&format!("{}/docs/intro", base)));
    assert!(fetched.contains(&format!("{}/bg.png", base)));

    let crawled = urls_on(&seen, Channel::AfterCrawl);
    assert!(crawled.contains(&format!("{}/style.css", base)));
    // The image cannot be parsed as a document
    assert!(!crawled.contains(&format!("{}/bg.png", base)));
    assert!(urls_on(&seen, Channel::Error).contains(&format!("{}/bg.png", base)));
    assert_eq!(count(&seen, Channel::Finish), 1);
}

#[tokio::test]
async fn test_start_while_crawling_is_a_no_op() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<html></html>").set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let crawler = Crawler::new(create_test_config()).unwrap();
    let seen = record(&crawler);

    let seed = format!("{}/slow", server.uri());
    let running = {
        let crawler = crawler.clone();
        let seed = seed.clone();
        tokio::spawn(async move { crawler.start(Some(seed.as_str())).await })
    };

    wait_for(&seen, Channel::BeforeCrawl, 1).await;
    assert_eq!(crawler.state(), EngineState::Crawling);
    crawler.start(Some(seed.as_str())).await.unwrap();

    running.await.unwrap().unwrap();
    assert_eq!(count(&seen, Channel::Start), 1);
    assert_eq!(count(&seen, Channel::Fetch), 1);
    assert_eq!(count(&seen, Channel::Finish), 1);
}

#[tokio::test]
async fn test_pause_holds_the_loop_and_stop_ends_it() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    let links: String = (0..5).map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i)).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!("<html><body>{}</body></html>", links)))
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        delay: 200,
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);

    let running = {
        let crawler = crawler.clone();
        let seed = format!("{}/", base);
        tokio::spawn(async move { crawler.start(Some(seed.as_str())).await })
    };

    wait_for(&seen, Channel::AfterCrawl, 1).await;
    crawler.pause();
    assert!(crawler.is_paused());
    assert_eq!(crawler.state(), EngineState::Paused);

    let fetched = count(&seen, Channel::Fetch);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count(&seen, Channel::Fetch), fetched);

    crawler.stop();
    running.await.unwrap().unwrap();

    assert_eq!(crawler.state(), EngineState::Idle);
    assert_eq!(count(&seen, Channel::Pause), 1);
    assert_eq!(count(&seen, Channel::Stop), 1);
    assert_eq!(count(&seen, Channel::Finish), 0);
    assert_eq!(crawler.frontier_len(), 5);
}

#[tokio::test]
async fn test_start_after_stop_continues_remaining_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/next">Next</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);

    // Stop from the first after-crawl so that /next stays queued
    {
        let handle = crawler.clone();
        crawler.on(Channel::AfterCrawl, move |_| handle.stop());
    }
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();
    assert_eq!(crawler.frontier_len(), 1);
    assert_eq!(count(&seen, Channel::Stop), 1);

    crawler.start(None).await.unwrap();
    assert_eq!(
        urls_on(&seen, Channel::AfterCrawl),
        vec![format!("{}/", base), format!("{}/next", base)]
    );
    assert_eq!(count(&seen, Channel::Start), 2);
}

#[tokio::test]
async fn test_failures_are_reported_and_the_session_finishes() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/broken">Broken</a><a href="http://127.0.0.1:1/gone">Gone</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    let broken = format!("{}/broken", base);
    let errors: Vec<Seen> = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.channel == Channel::Error)
        .cloned()
        .collect();
    assert!(errors
        .iter()
        .any(|s| s.url.as_deref() == Some(broken.as_str()) && s.status == Some(500)));
    assert!(errors
        .iter()
        .any(|s| s.url.as_deref() == Some("http://127.0.0.1:1/gone")));

    assert!(!urls_on(&seen, Channel::AfterCrawl).contains(&broken));
    assert_eq!(count(&seen, Channel::Finish), 1);
    assert_eq!(crawler.visited_len(), 3);
}

#[tokio::test]
async fn test_filter_rejects_discovered_urls() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><a href="/open">Open</a><a href="/secret">Secret</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/open"))
        .respond_with(html("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::builder(config)
        .filter(|url: &str| !url.contains("/secret"))
        .build()
        .unwrap();
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    let added = urls_on(&seen, Channel::AddUrl);
    assert!(added.contains(&format!("{}/open", base)));
    assert!(!added.contains(&format!("{}/secret", base)));
}

#[tokio::test]
async fn test_filter_applies_to_seed_when_dequeued() {
    let server = MockServer::start().await;

    let crawler = Crawler::builder(create_test_config())
        .filter(DomainFilter::new(Vec::new(), vec!["127.0.0.1".to_string()]))
        .build()
        .unwrap();
    let seen = record(&crawler);

    let seed = format!("{}/", server.uri());
    crawler.start(Some(seed.as_str())).await.unwrap();

    assert_eq!(urls_on(&seen, Channel::AddUrl), vec![seed.clone()]);
    assert_eq!(urls_on(&seen, Channel::FilterUrl), vec![seed]);
    assert_eq!(count(&seen, Channel::Fetch), 0);
}

#[tokio::test]
async fn test_noindex_header_and_meta_tag() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><meta name="robots" content="noindex, nofollow"></head>
            <body><a href="/child">Child</a><a href="/hidden">Hidden</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(html("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let config = CrawlerConfig {
        only_follow_sitemap: false,
        ..create_test_config()
    };
    let crawler = Crawler::new(config).unwrap();
    let seen = record(&crawler);
    crawler.start(Some(format!("{}/", base).as_str())).await.unwrap();

    let disallowed: Vec<Seen> = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.channel == Channel::DisallowUrl)
        .cloned()
        .collect();
    assert_eq!(disallowed.len(), 1);
    assert_eq!(disallowed[0].reason, Some(DisallowReason::MetaTag));
    assert_eq!(count(&seen, Channel::AfterCrawl), 0);

    let header_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tagged"))
        .respond_with(html("<html></html>").insert_header("X-Robots-Tag", "noindex"))
        .mount(&header_server)
        .await;

    let tagged = format!("{}/tagged", header_server.uri());
    crawler.start(Some(tagged.as_str())).await.unwrap();

    let reasons: Vec<Option<DisallowReason>> = seen
        .lock()
        .unwrap()
        .iter()
        .filter(|s| s.channel == Channel::DisallowUrl)
        .map(|s| s.reason)
        .collect();
    assert_eq!(
        reasons,
        vec![Some(DisallowReason::MetaTag), Some(DisallowReason::ResponseHeader)]
    );
    assert_eq!(urls_on(&seen, Channel::Fetch).last(), Some(&tagged));
    assert_eq!(count(&seen, Channel::AfterCrawl), 0);
}

#[tokio::test]
async fn test_restored_visited_url_is_skipped() {
    let server = MockServer::start().await;
    let url = format!("{}/seen", server.uri());

    let crawler = Crawler::new(create_test_config()).unwrap();
    let seen = record(&crawler);
    assert!(crawler.restore(CrawlSnapshot {
        frontier: vec![url.clone()],
        visited: vec![url.clone()],
    }));

    crawler.start(None).await.unwrap();

    assert_eq!(urls_on(&seen, Channel::SkipUrl), vec![url]);
    assert_eq!(count(&seen, Channel::Fetch), 0);
    assert_eq!(count(&seen, Channel::Finish), 1);
}
