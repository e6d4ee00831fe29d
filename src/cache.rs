use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::error;
use serde_json::Value;

use crate::errors::ApiError;

/// In-process TTL cache for expensive aggregate responses. Each entry
/// carries its own expiry; expired entries are swept on every insert.
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(req: &HttpRequest) -> String {
        format!("{}?{}", req.path(), req.query_string())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        let now = Instant::now();
        let fresh = entries
            .get(key)
            .filter(|(expires_at, _)| *expires_at > now)
            .map(|(_, value)| value.clone());
        if fresh.is_none() {
            entries.remove(key);
        }
        fresh
    }

    pub fn put(&self, key: String, value: Value, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            let now = Instant::now();
            entries.retain(|_, (expires_at, _)| *expires_at > now);
            entries.insert(key, (now + ttl, value));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serves a fresh cached body for this path and query, or computes and
    /// stores it. Errors are never cached.
    pub async fn respond<F>(&self, req: &HttpRequest, ttl: Duration, compute: F) -> HttpResponse
    where
        F: Future<Output = Result<Value, ApiError>>,
    {
        let key = Self::key(req);
        if let Some(value) = self.get(&key) {
            return HttpResponse::Ok().json(value);
        }
        match compute.await {
            Ok(value) => {
                self.put(key, value.clone(), ttl);
                HttpResponse::Ok().json(value)
            }
            Err(e) => {
                error!("{}: {}", key, e);
                e.error_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn returns_fresh_entries() {
        let cache = ResponseCache::new();
        cache.put("/api/crossvar/variables?".into(), json!([1, 2]), Duration::from_secs(600));
        assert_eq!(cache.get("/api/crossvar/variables?"), Some(json!([1, 2])));
        assert_eq!(cache.get("/other?"), None);
    }

    #[test]
    fn expires_entries_after_ttl() {
        let cache = ResponseCache::new();
        cache.put("k".into(), json!({"a": 1}), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_sweeps_expired_keys() {
        let cache = ResponseCache::new();
        for i in 0..500 {
            cache.put(format!("/api/empleo/ofertas?busqueda={}", i), json!([i]), Duration::from_millis(1));
        }
        cache.put("/api/empleo/stats?".into(), json!({}), Duration::from_secs(3600));
        std::thread::sleep(Duration::from_millis(10));
        cache.put("/api/empleo/ofertas?busqueda=final".into(), json!([]), Duration::from_secs(3600));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/api/empleo/stats?"), Some(json!({})));
    }

    #[actix_web::test]
    async fn respond_sweeps_expired_responses() {
        let cache = ResponseCache::new();
        for i in 0..200 {
            let uri = format!("/api/empleo/ofertas?busqueda={}", i);
            let req = actix_web::test::TestRequest::get().uri(&uri).to_http_request();
            cache.respond(&req, Duration::from_millis(1), async { Ok(json!([])) }).await;
        }
        std::thread::sleep(Duration::from_millis(10));
        let req = actix_web::test::TestRequest::get().uri("/api/empleo/ofertas?busqueda=x").to_http_request();
        cache.respond(&req, Duration::from_millis(1), async { Ok(json!([])) }).await;
        assert!(cache.len() <= 1);
    }

    #[actix_web::test]
    async fn respond_serves_cached_body() {
        let cache = ResponseCache::new();
        let req = actix_web::test::TestRequest::get().uri("/api/analytics/clusters?x=1").to_http_request();
        let first = cache.respond(&req, Duration::from_secs(60), async { Ok(json!({"n": 1})) }).await;
        assert!(first.status().is_success());
        let second = cache
            .respond(&req, Duration::from_secs(60), async { Err(ApiError::BadRequest("no".into())) })
            .await;
        assert!(second.status().is_success());
        assert_eq!(cache.get("/api/analytics/clusters?x=1"), Some(json!({"n": 1})));
    }

    #[actix_web::test]
    async fn respond_does_not_cache_errors() {
        let cache = ResponseCache::new();
        let req = actix_web::test::TestRequest::get().uri("/api/analytics/gaps").to_http_request();
        let resp = cache
            .respond(&req, Duration::from_secs(60), async { Err(ApiError::NotFound("sin datos".into())) })
            .await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
        assert_eq!(cache.get("/api/analytics/gaps?"), None);
    }
}
