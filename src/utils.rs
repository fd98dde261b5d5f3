use chrono::{DateTime, NaiveDateTime, Utc};
use glib::MainContext;
use once_cell::sync::Lazy;
use url::Url;

use crate::error::ChatError;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    RUNTIME.spawn(fut);
}

/// Runs `fut` on the shared runtime and waits for it from any executor,
/// including the glib main context.
pub async fn on_runtime<T, Fut>(fut: Fut) -> Result<T, ChatError>
where
    T: Send + 'static,
    Fut: std::future::Future<Output = Result<T, ChatError>> + Send + 'static,
{
    RUNTIME.spawn(fut).await?
}

pub fn glib_channel<T: Send + 'static>() -> (glib::Sender<T>, glib::Receiver<T>) {
    MainContext::channel(glib::Priority::default())
}

pub fn run_async_to_main<T, E, Fut>(fut: Fut) -> glib::Receiver<Result<T, E>>
where
    T: Send + 'static,
    E: Send + 'static,
    Fut: std::future::Future<Output = Result<T, E>> + Send + 'static,
{
    let (tx, rx) = glib_channel::<Result<T, E>>();
    spawn_async(async move {
        let res = fut.await;
        let _ = tx.send(res);
    });
    rx
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Websocket endpoint for a server base URL: `http` maps to `ws`, `https` to
/// `wss`, and `/ws` is appended to the base path.
pub fn ws_url(base_url: &str) -> Result<Url, ChatError> {
    let mut url = Url::parse(&normalize_url(base_url))?;
    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => return Err(ChatError::Config(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| ChatError::Config(format!("cannot switch {url} to {scheme}")))?;
    // Keep any base path so the socket sits next to the REST endpoints.
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// Renders a server timestamp as `DD-MM-YYYY HH:MM` in UTC. Timestamps
/// without an offset are taken as UTC; anything unparseable is returned as is.
pub fn format_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(ts) => ts.format("%d-%m-%Y %H:%M").to_string(),
        None => raw.to_string(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
