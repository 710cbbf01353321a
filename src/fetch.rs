use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::retry::{RetryPolicy, poll_until};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// One attempt at retrieving the text behind a URL, giving up after `timeout`.
///
/// Implementations do not retry; `fetch_json` layers the bounded wait on top.
pub trait PageFetcher {
    fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String> {
        (**self).fetch_text(url, timeout)
    }
}

/// Blocking HTTP fetcher holding one client (and cookie jar) for a whole run.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .cookie_store(true)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client })
    }

    /// Primes the session's cookies by loading the site once.
    pub fn warm_up(&self, url: &str) -> Result<()> {
        self.fetch_text(url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .map(|_| ())
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .header(USER_AGENT, "Mozilla/5.0")
            .header(ACCEPT, "application/json, text/html;q=0.9, */*;q=0.8")
            .send()
            .context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {}", status));
        }
        Ok(body)
    }
}

/// Fetches `url` until a non-empty JSON document arrives or the policy runs out.
///
/// Each request is capped at whatever is left of `policy.max_wait`.
pub fn fetch_json<F: PageFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    policy: &RetryPolicy,
) -> Option<Value> {
    let per_request = Duration::from_secs(REQUEST_TIMEOUT_SECS);
    poll_until(policy, |attempt, budget| {
        let body = match fetcher.fetch_text(url, budget.min(per_request)) {
            Ok(body) => body,
            Err(err) => {
                debug!(url, attempt, error = %err, "fetch attempt failed");
                return None;
            }
        };
        let text = extract_payload_text(&body);
        if text.is_empty() {
            debug!(url, attempt, "empty payload");
            return None;
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(url, attempt, error = %err, "payload not json yet");
                None
            }
        }
    })
}

/// Strips presentation markup around a JSON body: `<pre>` content first, then `<body>` text.
pub fn extract_payload_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    let inner = element_inner(trimmed, "pre")
        .or_else(|| element_inner(trimmed, "body"))
        .unwrap_or(trimmed);
    html_decode(&strip_tags(inner)).trim().to_string()
}

fn element_inner<'a>(html: &'a str, tag: &str) -> Option<&'a str> {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{tag}");
    let start = lower.find(&open)?;
    let content_start = start + lower[start..].find('>')? + 1;
    let close = format!("</{tag}>");
    let end = lower[content_start..]
        .find(&close)
        .map(|i| content_start + i)
        .unwrap_or(html.len());
    Some(&html[content_start..end])
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}
