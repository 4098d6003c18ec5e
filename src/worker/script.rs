//! Emission of the browser `sw.js`.
//!
//! The script body is a fixed template; the build only substitutes a JSON
//! object with the cache name, precache list, policy and version parameter.

use super::WorkerError;
use crate::config::{WorkerConfig, WorkerPolicy};
use serde::Serialize;

/// File name of the emitted worker, at the output root.
pub const SCRIPT_FILENAME: &str = "sw.js";

const TEMPLATE: &str = include_str!("../../static/sw.js");
const PLACEHOLDER: &str = "__CONFIG__";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptConfig<'a> {
    cache_name: &'a str,
    precache: &'a [String],
    policy: WorkerPolicy,
    version_param: &'a str,
}

/// Render `sw.js` for `config`, precaching `precache` at install.
pub fn render_service_worker(
    config: &WorkerConfig,
    precache: &[String],
) -> Result<String, WorkerError> {
    let json = serde_json::to_string_pretty(&ScriptConfig {
        cache_name: &config.cache_name,
        precache,
        policy: config.policy,
        version_param: &config.version_param,
    })?;
    Ok(TEMPLATE.replacen(PLACEHOLDER, &json, 1))
}

/// Install-time resource list: versioned stylesheet URLs (when enabled)
/// followed by the configured extras, without duplicates.
pub fn precache_list(config: &WorkerConfig, stylesheet_urls: &[String]) -> Vec<String> {
    let stylesheets = stylesheet_urls
        .iter()
        .filter(|_| config.precache_stylesheets);
    let mut list: Vec<String> = Vec::new();
    for url in stylesheets.chain(config.precache.iter()) {
        if !list.contains(url) {
            list.push(url.clone());
        }
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_config_object() {
        let config = WorkerConfig {
            cache_name: "site-v1".to_string(),
            ..WorkerConfig::default()
        };
        let js =
            render_service_worker(&config, &["/css/style.css?v=abcd1234".to_string()]).unwrap();

        assert!(!js.contains(PLACEHOLDER));
        assert!(js.contains(r#""cacheName": "site-v1""#));
        assert!(js.contains(r#""policy": "versioned""#));
        assert!(js.contains(r#""versionParam": "v""#));
        assert!(js.contains(r#""/css/style.css?v=abcd1234""#));
        assert!(js.contains("addEventListener('install'"));
        assert!(js.contains("addEventListener('fetch'"));
    }

    #[test]
    fn lazy_store_extends_fetch_event() {
        let js = render_service_worker(&WorkerConfig::default(), &[]).unwrap();
        assert!(js.contains("event.waitUntil(cache.put(request, response.clone()))"));
        assert_eq!(
            js.matches("cache.put(").count(),
            js.matches("waitUntil(cache.put(").count()
        );
    }

    #[test]
    fn legacy_policy_name() {
        let config = WorkerConfig {
            policy: WorkerPolicy::CacheFirst,
            ..WorkerConfig::default()
        };
        let js = render_service_worker(&config, &[]).unwrap();
        assert!(js.contains(r#""policy": "cache-first""#));
        assert!(js.contains(r#""precache": []"#));
    }

    #[test]
    fn config_is_json_escaped() {
        let config = WorkerConfig {
            cache_name: r#"a"b"#.to_string(),
            ..WorkerConfig::default()
        };
        let js = render_service_worker(&config, &[]).unwrap();
        assert!(js.contains(r#""cacheName": "a\"b""#));
    }

    #[test]
    fn precache_list_orders_and_dedups() {
        let config = WorkerConfig {
            precache: vec!["/".to_string(), "/css/a.css?v=1".to_string()],
            ..WorkerConfig::default()
        };
        let css = vec!["/css/a.css?v=1".to_string(), "/css/b.css?v=1".to_string()];
        assert_eq!(
            precache_list(&config, &css),
            vec!["/css/a.css?v=1", "/css/b.css?v=1", "/"]
        );

        let config = WorkerConfig {
            precache_stylesheets: false,
            ..config
        };
        assert_eq!(precache_list(&config, &css), vec!["/", "/css/a.css?v=1"]);
    }
}
