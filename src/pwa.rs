//! Service worker and web app manifest.

use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

pub const CACHE_NAME: &str = "mundo-musical-v1";

pub const PRECACHE_URLS: &[&str] = &[
    "/",
    "/videos",
    "/admin/login",
    "/admin/dashboard",
    "/icons/dino-icon.png",
    "/images/dino&family/dino_cp.png",
    "/images/dino&family/dininho.png",
    "/images/dino&family/irmaozinhos.png",
    "/images/dino&family/Dino.png",
    "/favicon.ico",
    "/manifest.json",
];

/// Install caches every precache URL, fetch answers from the cache before the
/// network, activate drops caches from older versions.
pub fn service_worker_script() -> String {
    let cache_name = Value::from(CACHE_NAME);
    let urls = Value::from(PRECACHE_URLS.to_vec());

    format!(
        r#"const CACHE_NAME = {cache_name};
const urlsToCache = {urls};

self.addEventListener('install', (event) => {{
  event.waitUntil(
    caches.open(CACHE_NAME).then((cache) => cache.addAll(urlsToCache))
  );
}});

self.addEventListener('fetch', (event) => {{
  event.respondWith(
    caches.match(event.request).then((response) => response || fetch(event.request))
  );
}});

self.addEventListener('activate', (event) => {{
  event.waitUntil(
    caches.keys().then((cacheNames) =>
      Promise.all(
        cacheNames
          .filter((cacheName) => cacheName !== CACHE_NAME)
          .map((cacheName) => caches.delete(cacheName))
      )
    )
  );
}});
"#
    )
}

pub fn manifest() -> Value {
    json!({
        "name": "Mundo Musical do Dino",
        "short_name": "Mundo Musical",
        "description": "Vídeos educativos e diversão para os mais pequenos",
        "start_url": "/",
        "display": "standalone",
        "background_color": "#fff7ed",
        "theme_color": "#f97316",
        "lang": "pt",
        "icons": [
            { "src": "/icons/dino-icon.png", "sizes": "192x192", "type": "image/png" },
            { "src": "/icons/dino-icon.png", "sizes": "512x512", "type": "image/png" }
        ]
    })
}

pub async fn service_worker() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        service_worker_script(),
    )
}

pub async fn web_manifest() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        Json(manifest()),
    )
}
