//! Fake MangaDex upstream and a running API server

use manga_archiver::api::create_router;
use manga_archiver::{Config, MangaDexClient, Pipeline};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Body served for one page: a recognizable header followed by filler so that
/// deflate has something to compress
pub fn page_body(chapter_id: &str, file: &str) -> Vec<u8> {
    let mut body = format!("{chapter_id}/{file}\n").into_bytes();
    body.extend(std::iter::repeat_n(b'.', 16 * 1024));
    body
}

/// A wiremock server speaking the subset of the MangaDex API the client uses
pub struct FakeMangaDex {
    pub server: MockServer,
}

impl FakeMangaDex {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Answer a title search with `ids` in order
    pub async fn search(&self, title: &str, ids: &[&str]) {
        let data: Vec<_> = ids
            .iter()
            .map(|id| json!({ "id": id, "attributes": { "title": { "en": title } } }))
            .collect();

        Mock::given(method("GET"))
            .and(path("/manga"))
            .and(query_param("title", title))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": data })))
            .mount(&self.server)
            .await;
    }

    /// Serve a chapter feed; each chapter is `(id, label, language)`
    ///
    /// Like the real API, only chapters in one of the requested
    /// `translatedLanguage[]` values are returned.
    pub async fn feed(&self, manga_id: &str, chapters: &[(&str, Option<&str>, &str)]) {
        let chapters: Vec<_> = chapters
            .iter()
            .map(|(id, label, lang)| {
                json!({
                    "id": id,
                    "type": "chapter",
                    "attributes": { "chapter": label, "translatedLanguage": lang, "title": null }
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path("/chapter"))
            .and(query_param("manga", manga_id))
            .respond_with(move |request: &Request| {
                let languages: Vec<String> = request
                    .url
                    .query_pairs()
                    .filter(|(key, _)| key == "translatedLanguage[]")
                    .map(|(_, value)| value.into_owned())
                    .collect();
                let data: Vec<_> = chapters
                    .iter()
                    .filter(|c| {
                        c["attributes"]["translatedLanguage"]
                            .as_str()
                            .is_some_and(|lang| languages.iter().any(|l| l == lang))
                    })
                    .cloned()
                    .collect();
                let total = data.len();
                ResponseTemplate::new(200).set_body_json(json!({ "data": data, "total": total }))
            })
            .mount(&self.server)
            .await;
    }

    /// Serve the at-home descriptor of a chapter without mounting its images
    pub async fn descriptor(&self, chapter_id: &str, files: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/at-home/server/{chapter_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "ok",
                "baseUrl": self.uri(),
                "chapter": { "hash": hash(chapter_id), "data": files, "dataSaver": [] }
            })))
            .mount(&self.server)
            .await;
    }

    /// Serve one page image, optionally after a delay
    pub async fn page(&self, chapter_id: &str, file: &str, delay: Option<Duration>) {
        let mut response = ResponseTemplate::new(200)
            .insert_header("content-type", "image/jpeg")
            .set_body_bytes(page_body(chapter_id, file));
        if let Some(delay) = delay {
            response = response.set_delay(delay);
        }

        Mock::given(method("GET"))
            .and(path(format!("/data/{}/{}", hash(chapter_id), file)))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Make one page image fail with `status`
    pub async fn broken_page(&self, chapter_id: &str, file: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/data/{}/{}", hash(chapter_id), file)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Descriptor plus every page image of a chapter
    pub async fn chapter(&self, chapter_id: &str, files: &[&str]) {
        self.descriptor(chapter_id, files).await;
        for file in files {
            self.page(chapter_id, file, None).await;
        }
    }
}

fn hash(chapter_id: &str) -> String {
    format!("hash-{chapter_id}")
}

/// Config pointing at `upstream`
pub fn config_for(upstream: &FakeMangaDex) -> Config {
    let mut config = Config::default();
    config.upstream.base_url = upstream.uri();
    config.upstream.timeout = Duration::from_secs(10);
    config
}

/// An API server bound to an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn(config: Config) -> Self {
        let config = Arc::new(config);
        let catalog = Arc::new(MangaDexClient::new(&config.upstream).unwrap());
        let pipeline = Arc::new(Pipeline::new(catalog, &config));
        let app = create_router(pipeline, config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = stopped.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            stop: Some(stop),
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
