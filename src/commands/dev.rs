use std::fs;
use std::net::ToSocketAddrs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, mpsc};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Response, Server};

use crate::cli::DevArgs;
use crate::config::{CONFIG_FILE, Config, Redirect, resolve_root};
use crate::render::{OUTPUT_DIR, RenderPlan, render_site};

const LIVE_RELOAD_ID: &str = "__quire_live_reload__";
const LIVE_RELOAD_SNIPPET: &str = r#"<script id="__quire_live_reload__">(function(){if(window.__quireLiveReload){return;}window.__quireLiveReload=true;let last=0;async function poll(){try{const res=await fetch('/__quire__/poll?since='+last+'&_='+(Date.now()),{cache:'no-store'});if(res.ok){const data=await res.json();if(typeof data.timestamp==='number'){last=data.timestamp;}if(data.reload){window.location.reload();return;}}}catch(e){}setTimeout(poll,1000);}poll();})();</script>"#;

type Redirects = Arc<RwLock<Vec<Redirect>>>;

pub fn run_dev_command(args: DevArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    let html_root = root.join(OUTPUT_DIR);
    fs::create_dir_all(&html_root).context("failed to create html directory")?;

    let plan = RenderPlan {
        verbose: args.verbose,
    };
    render_site(&root, plan).context("initial render before dev server failed")?;

    let redirects: Redirects = Arc::new(RwLock::new(load_redirects(&root)?));
    let latest_change = Arc::new(AtomicU64::new(now_timestamp()));
    let (tx, rx) = mpsc::channel();

    let watcher_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |event| match event {
        Ok(_event) => {
            let _ = watcher_tx.send(());
        }
        Err(err) => {
            eprintln!("[quire::dev] watcher error: {err}");
        }
    })?;

    register_watch(&mut watcher, root.join("posts"))?;
    register_watch(&mut watcher, root.join("templates"))?;
    register_watch(&mut watcher, root.join("static"))?;
    register_watch_file(&mut watcher, root.join(CONFIG_FILE))?;

    let rebuild_root = root.clone();
    let rebuild_latest = Arc::clone(&latest_change);
    let rebuild_redirects = Arc::clone(&redirects);

    thread::spawn(move || {
        while let Ok(()) = rx.recv() {
            while rx.try_recv().is_ok() {}
            if let Err(error) = render_site(&rebuild_root, plan) {
                eprintln!("[quire::dev] render error: {error:#}");
                continue;
            }
            match load_redirects(&rebuild_root) {
                Ok(fresh) => {
                    if let Ok(mut current) = rebuild_redirects.write() {
                        *current = fresh;
                    }
                }
                Err(error) => eprintln!("[quire::dev] config error: {error:#}"),
            }
            rebuild_latest.store(now_timestamp(), Ordering::SeqCst);
        }
    });

    let address = format!("{}:{}", args.host, args.port);
    let listener_addr = address
        .to_socket_addrs()
        .context("invalid host/port combination")?
        .next()
        .context("failed to resolve dev server address")?;
    println!(
        "quire dev server running at http://{}:{}",
        listener_addr.ip(),
        listener_addr.port()
    );

    let server = Server::http(listener_addr)
        .map_err(|err| anyhow::anyhow!("failed to start HTTP server: {err}"))?;

    for request in server.incoming_requests() {
        let url = request.url().to_string();
        let (path, query) = split_url(&url);
        let response = if path == "/__quire__/poll" {
            handle_poll(query, &latest_change)
        } else if let Some(response) = redirect_response(path, &redirects) {
            response
        } else {
            serve_path(&html_root, path, &latest_change)
        };

        if let Err(err) = request.respond(response) {
            eprintln!("[quire::dev] respond error: {err}");
        }
    }

    Ok(())
}

fn load_redirects(root: &Path) -> Result<Vec<Redirect>> {
    Ok(Config::load(root.join(CONFIG_FILE))?.redirects)
}

fn register_watch(watcher: &mut RecommendedWatcher, path: PathBuf) -> Result<()> {
    if path.exists() {
        watcher
            .watch(&path, RecursiveMode::Recursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;
    }
    Ok(())
}

fn register_watch_file(watcher: &mut RecommendedWatcher, path: PathBuf) -> Result<()> {
    if path.exists() {
        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", path.display()))?;
    }
    Ok(())
}

fn find_redirect<'a>(redirects: &'a [Redirect], raw_path: &str) -> Option<&'a Redirect> {
    let decoded = percent_decode_str(raw_path).decode_utf8_lossy();
    redirects
        .iter()
        .find(|redirect| redirect.matches(decoded.as_ref()))
}

fn redirect_response(
    raw_path: &str,
    redirects: &Redirects,
) -> Option<Response<std::io::Cursor<Vec<u8>>>> {
    let redirects = redirects.read().ok()?;
    let redirect = find_redirect(&redirects, raw_path)?;
    let mut response = Response::from_string(format!("Redirecting to {}", redirect.destination))
        .with_status_code(redirect.status_code());
    add_header(&mut response, "Location", &redirect.destination);
    add_header(&mut response, "Cache-Control", "no-store, max-age=0");
    Some(response)
}

fn serve_path(
    html_root: &Path,
    raw_path: &str,
    latest_change: &Arc<AtomicU64>,
) -> Response<std::io::Cursor<Vec<u8>>> {
    match resolve_path(html_root, raw_path) {
        Ok((resolved, is_html)) => {
            if !resolved.exists() || resolved.is_dir() {
                return not_found();
            }
            if is_html {
                match fs::read_to_string(&resolved) {
                    Ok(contents) => {
                        let body = inject_live_reload(&contents, latest_change);
                        let mut response = Response::from_string(body);
                        add_header(&mut response, "Content-Type", "text/html; charset=utf-8");
                        add_header(&mut response, "Cache-Control", "no-store, max-age=0");
                        response
                    }
                    Err(err) => internal_error(err.to_string()),
                }
            } else {
                match fs::read(&resolved) {
                    Ok(bytes) => {
                        let mut response = Response::from_data(bytes);
                        let mime = mime_guess::from_path(&resolved).first_or_octet_stream();
                        add_header(&mut response, "Content-Type", mime.essence_str());
                        add_header(&mut response, "Cache-Control", "no-store, max-age=0");
                        response
                    }
                    Err(err) => internal_error(err.to_string()),
                }
            }
        }
        Err(err) => {
            eprintln!("[quire::dev] path resolution error: {err}");
            forbidden()
        }
    }
}

fn resolve_path(html_root: &Path, raw_path: &str) -> Result<(PathBuf, bool)> {
    let path = raw_path.trim_start_matches('/');
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .context("failed to decode URL path")?;
    let mut safe = PathBuf::new();
    if decoded.is_empty() {
        safe.push("index.html");
    } else {
        for component in Path::new(decoded.as_ref()).components() {
            match component {
                Component::Normal(part) => safe.push(part),
                Component::CurDir => {}
                _ => bail!("invalid path component"),
            }
        }
    }
    let candidate = html_root.join(&safe);
    if candidate.is_dir() {
        Ok((candidate.join("index.html"), true))
    } else {
        let is_html = candidate
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("html"))
            .unwrap_or(false);
        Ok((candidate, is_html))
    }
}

fn inject_live_reload(original: &str, latest_change: &Arc<AtomicU64>) -> String {
    if original.contains(LIVE_RELOAD_ID) {
        return original.to_string();
    }
    let mut rendered = original.to_string();
    let snippet = LIVE_RELOAD_SNIPPET.replace(
        "last=0",
        &format!("last={}", latest_change.load(Ordering::SeqCst)),
    );
    if let Some(index) = rendered.rfind("</body>") {
        rendered.insert_str(index, &snippet);
    } else if let Some(index) = rendered.rfind("</html>") {
        rendered.insert_str(index, &snippet);
    } else {
        rendered.push_str(&snippet);
    }
    rendered
}

fn handle_poll(
    query: Option<&str>,
    latest_change: &Arc<AtomicU64>,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let since = query.and_then(|q| parse_since(q).ok()).unwrap_or(0);
    let current = latest_change.load(Ordering::SeqCst);
    let payload = serde_json::json!({
        "reload": current > since,
        "timestamp": current,
    })
    .to_string();
    let mut response = Response::from_string(payload);
    add_header(&mut response, "Content-Type", "application/json");
    add_header(&mut response, "Cache-Control", "no-store, max-age=0");
    response
}

fn parse_since(query: &str) -> Result<u64> {
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=')
            && key == "since"
        {
            let decoded = percent_decode_str(value).decode_utf8()?;
            return Ok(decoded.parse::<u64>()?);
        }
    }
    bail!("since not found")
}

fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

fn not_found() -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string("Not Found").with_status_code(404)
}

fn forbidden() -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string("Forbidden").with_status_code(403)
}

fn internal_error(message: String) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(message).with_status_code(500)
}

fn add_header(response: &mut Response<std::io::Cursor<Vec<u8>>>, key: &str, value: &str) {
    if let Ok(header) = Header::from_bytes(key.as_bytes(), value.as_bytes()) {
        response.add_header(header);
    }
}

fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn redirect(source: &str, destination: &str, permanent: bool) -> Redirect {
        Redirect {
            source: source.to_string(),
            destination: destination.to_string(),
            permanent,
        }
    }

    #[test]
    fn injects_snippet_before_body() {
        let html = "<html><body><p>Hi</p></body></html>";
        let timestamp = Arc::new(AtomicU64::new(42));
        let with_reload = inject_live_reload(html, &timestamp);
        assert!(with_reload.contains(LIVE_RELOAD_ID));
        assert!(with_reload.contains("last=42"));
        assert!(with_reload.ends_with("</body></html>"));
    }

    #[test]
    fn does_not_duplicate_snippet() {
        let html = format!("<html><body>{LIVE_RELOAD_SNIPPET}</body></html>");
        let timestamp = Arc::new(AtomicU64::new(99));
        let result = inject_live_reload(&html, &timestamp);
        assert_eq!(result.matches(LIVE_RELOAD_ID).count(), 1);
    }

    #[test]
    fn parse_since_reads_query_value() {
        assert_eq!(parse_since("since=123&foo=bar").unwrap(), 123);
        assert!(parse_since("foo=bar").is_err());
    }

    #[test]
    fn redirects_match_with_or_without_trailing_slash() {
        let redirects = vec![
            redirect("/blog/bicep-part-one", "/blog/bicep/part-one", true),
            redirect("/old-feed/", "https://feeds.example.com/blog", false),
        ];

        let found = find_redirect(&redirects, "/blog/bicep-part-one/").unwrap();
        assert_eq!(found.status_code(), 308);
        let found = find_redirect(&redirects, "/old-feed").unwrap();
        assert_eq!(found.status_code(), 307);
        assert!(find_redirect(&redirects, "/blog/bicep").is_none());
    }

    #[test]
    fn redirect_response_carries_location() {
        let redirects: Redirects = Arc::new(RwLock::new(vec![redirect(
            "/old",
            "/blog/new/",
            true,
        )]));
        let response = redirect_response("/old", &redirects).unwrap();
        assert_eq!(response.status_code().0, 308);
        assert!(redirect_response("/new", &redirects).is_none());
    }

    #[test]
    fn resolves_directories_to_index_and_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let html = dir.path();
        fs::create_dir_all(html.join("tags/bicep")).unwrap();

        let (path, is_html) = resolve_path(html, "/tags/bicep/").unwrap();
        assert_eq!(path, html.join("tags/bicep/index.html"));
        assert!(is_html);

        let (path, is_html) = resolve_path(html, "/tag-data.json").unwrap();
        assert_eq!(path, html.join("tag-data.json"));
        assert!(!is_html);

        assert!(resolve_path(html, "/../secret").is_err());
    }
}
