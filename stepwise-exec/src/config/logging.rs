use std::collections::BTreeMap;

/// Controls the per-step request/response log lines emitted at `debug` level.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_requests: bool,
    pub log_responses: bool,
    pub log_bodies: bool,
    pub max_body_chars: usize,
    /// Lowercased header names that are always redacted.
    pub redact_headers: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_requests: true,
            log_responses: true,
            log_bodies: false,
            max_body_chars: 2048,
            redact_headers: vec![
                "authorization".to_string(),
                "cookie".to_string(),
                "set-cookie".to_string(),
                "proxy-authorization".to_string(),
                "x-api-key".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    pub fn quiet() -> Self {
        Self {
            log_requests: false,
            log_responses: false,
            ..Self::default()
        }
    }

    pub fn sanitize_headers(&self, headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut out = headers.clone();
        for name in &self.redact_headers {
            redact_case_insensitive(&mut out, name);
        }
        out
    }

    /// Lossy UTF-8 body, cut at `max_body_chars` with a marker.
    pub fn truncate_body(&self, body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        match text.char_indices().nth(self.max_body_chars) {
            Some((cut, _)) => format!("{}...<truncated>", &text[..cut]),
            None => text.into_owned(),
        }
    }
}

fn redact_case_insensitive(map: &mut BTreeMap<String, String>, header_lower: &str) {
    let keys = map
        .keys()
        .filter(|k| k.eq_ignore_ascii_case(header_lower))
        .cloned()
        .collect::<Vec<_>>();
    for k in keys {
        map.insert(k, "<redacted>".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_regardless_of_case() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer abc".to_string());
        headers.insert("X-Api-Key".to_string(), "k".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        let out = LoggingConfig::default().sanitize_headers(&headers);
        assert_eq!(out["Authorization"], "<redacted>");
        assert_eq!(out["X-Api-Key"], "<redacted>");
        assert_eq!(out["Accept"], "application/json");
    }

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let cfg = LoggingConfig {
            max_body_chars: 3,
            ..LoggingConfig::default()
        };
        assert_eq!(cfg.truncate_body("héllo".as_bytes()), "hél...<truncated>");
        assert_eq!(cfg.truncate_body(b"hi"), "hi");
    }
}
