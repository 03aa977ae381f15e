use async_trait::async_trait;
use pkg_catalog_core::contract::{ObjectStore, StoreError};
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::OnceLock;
use std::time::Duration;

/// Object store speaking the S3 REST API over plain HTTP (public-read buckets).
pub struct HttpBucketStore {
    client: Client,
    endpoint: String,
}

impl HttpBucketStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }
}

/// One page of a ListObjectsV2 response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListPage {
    pub children: Vec<String>,
    pub next_token: Option<String>,
}

struct ListPatterns {
    common_prefix: Regex,
    truncated: Regex,
    next_token: Regex,
    entity: Regex,
}

fn patterns() -> &'static ListPatterns {
    static PATTERNS: OnceLock<ListPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ListPatterns {
        common_prefix: Regex::new(r"<CommonPrefixes>\s*<Prefix>([^<]*)</Prefix>")
            .expect("static regex"),
        truncated: Regex::new(r"<IsTruncated>\s*true\s*</IsTruncated>").expect("static regex"),
        next_token: Regex::new(r"<NextContinuationToken>([^<]*)</NextContinuationToken>")
            .expect("static regex"),
        entity: Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|quot|apos|amp);").expect("static regex"),
    })
}

fn unescape_xml(text: &str) -> String {
    patterns()
        .entity
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => name
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .unwrap_or_else(|| name[1..].parse())
                    .ok()
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Extract child names under `prefix` from a ListObjectsV2 body listed with `delimiter=/`.
pub fn parse_list_objects(xml: &str, prefix: &str) -> ListPage {
    let patterns = patterns();
    let parent = format!("{}/", prefix.trim_end_matches('/'));

    let children = patterns
        .common_prefix
        .captures_iter(xml)
        .map(|caps| unescape_xml(&caps[1]))
        .filter_map(|full| {
            full.strip_prefix(&parent)
                .map(|rest| rest.trim_end_matches('/').to_string())
        })
        .filter(|name| !name.is_empty())
        .collect();

    let next_token = if patterns.truncated.is_match(xml) {
        patterns
            .next_token
            .captures(xml)
            .map(|caps| unescape_xml(&caps[1]))
    } else {
        None
    };

    ListPage {
        children,
        next_token,
    }
}

#[async_trait]
impl ObjectStore for HttpBucketStore {
    async fn list_children(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let list_prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut children = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let mut query = vec![
                ("list-type", "2".to_string()),
                ("prefix", list_prefix.clone()),
                ("delimiter", "/".to_string()),
            ];
            if let Some(t) = &token {
                query.push(("continuation-token", t.clone()));
            }

            let response = self
                .client
                .get(format!("{}/", self.endpoint))
                .query(&query)
                .send()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(StoreError::Http {
                    status: status.as_u16(),
                });
            }
            let body = response
                .text()
                .await
                .map_err(|e| StoreError::Transport(e.to_string()))?;

            let page = parse_list_objects(&body, prefix);
            children.extend(page.children);
            match page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    tracing::warn!(prefix = %prefix, token = %next, "Continuation token repeated, stopping listing");
                    break;
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }
        Ok(children)
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let url = format!("{}/{}", self.endpoint, key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        match response.status() {
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| StoreError::Transport(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status => Err(StoreError::Http {
                status: status.as_u16(),
            }),
        }
    }
}
