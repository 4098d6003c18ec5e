//! Service worker integration tests: the emitted `sw.js` in a real browser.
//!
//! These tests use headless Chrome over a local HTTP server (service workers
//! require HTTP, not file://). The server counts requests per URL, so a test
//! can tell whether a response came from the worker's cache or the network.
//!
//! Run with: `cargo test --test browser_sw -- --ignored`

use headless_chrome::{Browser, LaunchOptions, Tab};
use std::collections::HashMap;
use std::io::{Read as _, Write as _};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const CACHE_NAME: &str = "quire-cache";

// ===========================================================================
// Minimal HTTP server for SW testing (SWs require HTTP, not file://)
// ===========================================================================

type Hits = Arc<Mutex<HashMap<String, usize>>>;

struct TestServer {
    port: u16,
    hits: Hits,
    _stop: std::sync::mpsc::Sender<()>,
}

impl TestServer {
    fn start(root: PathBuf) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let hits: Hits = Arc::default();
        let server_hits = Arc::clone(&hits);

        thread::spawn(move || {
            listener.set_nonblocking(true).unwrap();
            loop {
                if rx.try_recv().is_ok() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, _)) => {
                        let root = root.clone();
                        let hits = Arc::clone(&server_hits);
                        thread::spawn(move || serve_request(stream, &root, &hits));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            port,
            hits,
            _stop: tx,
        }
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests the server answered for `target` (path plus query).
    fn hits(&self, target: &str) -> usize {
        self.hits.lock().unwrap().get(target).copied().unwrap_or(0)
    }
}

fn serve_request(mut stream: std::net::TcpStream, root: &Path, hits: &Hits) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 4096];
    let n = match stream.read(&mut buf) {
        Ok(n) if n > 0 => n,
        _ => return,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let target = request.split_whitespace().nth(1).unwrap_or("/").to_string();
    *hits.lock().unwrap().entry(target.clone()).or_default() += 1;

    // Query strings select cache entries, not files
    let path = target.split('?').next().unwrap_or("/");
    let mut file_path = root.join(path.trim_start_matches('/'));
    if file_path.is_dir() {
        file_path = file_path.join("index.html");
    }

    let (status, body, ct) = if file_path.is_file() {
        let body = std::fs::read(&file_path).unwrap_or_default();
        let ext = file_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let ct = match ext {
            "html" => "text/html; charset=utf-8",
            "js" => "application/javascript",
            "css" => "text/css",
            "xml" => "application/rss+xml",
            _ => "application/octet-stream",
        };
        ("200 OK", body, ct)
    } else {
        ("404 Not Found", b"Not Found".to_vec(), "text/plain")
    };

    let header = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {ct}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

// ===========================================================================
// Setup helpers
// ===========================================================================

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Build a small site once per test binary. Returns the output directory.
fn built_site() -> &'static Path {
    static SITE: OnceLock<(TempDir, TempDir)> = OnceLock::new();
    let (_, output) = SITE.get_or_init(|| {
        let content = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(content.path(), "css/style.css", "body { font-family: serif; }");
        write(content.path(), "index.md", "Welcome.");
        write(content.path(), "about.md", "# About\n\nMe.");
        write(content.path(), "posts/2024-03-09-hello.md", "# Hello\n\nFirst post.");

        let status = Command::new(env!("CARGO_BIN_EXE_quire"))
            .args([
                "build",
                "--source",
                content.path().to_str().unwrap(),
                "--output",
                output.path().to_str().unwrap(),
            ])
            .status()
            .expect("failed to run quire");
        assert!(status.success(), "fixture generation failed");
        (content, output)
    });
    output.path()
}

/// Versioned stylesheet URL as linked from the generated home page.
fn stylesheet_url() -> String {
    let home = std::fs::read_to_string(built_site().join("index.html")).unwrap();
    let start = home.find("/css/style.css?v=").expect("no versioned stylesheet link");
    let end = start + home[start..].find('"').unwrap();
    home[start..end].to_string()
}

fn browser() -> &'static Browser {
    static B: OnceLock<Browser> = OnceLock::new();
    B.get_or_init(|| {
        Browser::new(LaunchOptions {
            window_size: Some((1280, 800)),
            ..Default::default()
        })
        .expect("failed to launch Chrome")
    })
}

fn start_server() -> TestServer {
    TestServer::start(built_site().to_path_buf())
}

/// Wait for the service worker to reach the `activated` state.
/// Panics after 10 s if the SW never activates (install/activate failed).
fn wait_for_sw(tab: &Tab) {
    tab.evaluate(
        r#"Promise.race([
            navigator.serviceWorker.ready.then((reg) => {
                const sw = reg.active;
                if (sw && sw.state === 'activated') return 'ok';
                return new Promise((resolve) => {
                    sw.addEventListener('statechange', () => {
                        if (sw.state === 'activated') resolve('ok');
                    });
                });
            }),
            new Promise((_, reject) =>
                setTimeout(() => reject('SW activation timeout (10 s)'), 10000)
            ),
        ])"#,
        true,
    )
    .expect("service worker failed to activate");
}

/// Open the site, wait for the worker, reload so it controls the page.
fn controlled_tab(server: &TestServer) -> Arc<Tab> {
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&server.url())
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    wait_for_sw(&tab);
    tab.navigate_to(&server.url())
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    thread::sleep(Duration::from_millis(300));
    tab
}

/// Cached request URLs as path plus query.
fn cached_urls(tab: &Tab) -> Vec<String> {
    let js = format!(
        r#"(async () => {{
            const cache = await caches.open('{CACHE_NAME}');
            const keys = await cache.keys();
            return JSON.stringify(keys.map(r => {{
                const u = new URL(r.url);
                return u.pathname + u.search;
            }}));
        }})()"#
    );
    let result = tab.evaluate(&js, true).unwrap();
    serde_json::from_str(result.value.unwrap().as_str().unwrap()).unwrap()
}

fn fetch_ok(tab: &Tab, url: &str) -> bool {
    tab.evaluate(&format!("fetch('{url}').then(r => r.ok)"), true)
        .unwrap()
        .value
        .unwrap()
        .as_bool()
        .unwrap()
}

// ===========================================================================
// Install
// ===========================================================================

#[test]
#[ignore]
fn sw_activates_on_first_load() {
    let server = start_server();
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&server.url())
        .unwrap()
        .wait_until_navigated()
        .unwrap();

    wait_for_sw(&tab);
}

#[test]
#[ignore]
fn sw_precaches_versioned_stylesheet_on_install() {
    let server = start_server();
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&server.url())
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    wait_for_sw(&tab);

    let urls = cached_urls(&tab);
    assert!(
        urls.contains(&stylesheet_url()),
        "should precache {}, got: {urls:?}",
        stylesheet_url()
    );
}

// ===========================================================================
// Versioned cache-first
// ===========================================================================

#[test]
#[ignore]
fn sw_serves_versioned_url_from_cache() {
    let server = start_server();
    let tab = controlled_tab(&server);

    let url = "/css/style.css?v=lazy-entry";
    assert!(fetch_ok(&tab, url), "first fetch should succeed");
    thread::sleep(Duration::from_millis(300));
    assert!(fetch_ok(&tab, url), "second fetch should succeed");

    assert_eq!(server.hits(url), 1, "second fetch must not reach the network");
    assert!(cached_urls(&tab).contains(&url.to_string()));
}

#[test]
#[ignore]
fn sw_does_not_intercept_unversioned_urls() {
    let server = start_server();
    let tab = controlled_tab(&server);

    assert!(fetch_ok(&tab, "/about/"));
    assert!(fetch_ok(&tab, "/about/"));
    thread::sleep(Duration::from_millis(300));

    assert!(server.hits("/about/") >= 2, "unversioned fetches go to the network");
    let urls = cached_urls(&tab);
    assert!(
        urls.iter().all(|u| u.contains("?v=")),
        "only versioned URLs may be cached, got: {urls:?}"
    );
}

#[test]
#[ignore]
fn sw_does_not_cache_error_responses() {
    let server = start_server();
    let tab = controlled_tab(&server);

    let url = "/does-not-exist.css?v=1";
    assert!(!fetch_ok(&tab, url));
    thread::sleep(Duration::from_millis(300));

    assert!(
        !cached_urls(&tab).contains(&url.to_string()),
        "404 responses should NOT be cached"
    );
}
