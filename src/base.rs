//! BaseProvider (C4): behaviour shared by every adapter — typed error
//! construction, retry classification and execution, shape normalization,
//! and the client-side filter/paginate semantics used by `paging=client`
//! adapters.

use std::future::Future;

use rand::Rng;

use crate::error::{ErrorKind, GatewayError, Result};
use crate::types::{Capabilities, DnsRecord, RecordQuery};

const RETRY_BASE: std::time::Duration = std::time::Duration::from_millis(250);
const RETRY_MAX_DELAY: std::time::Duration = std::time::Duration::from_secs(10);

/// Helper struct adapters hold by value (composition, not inheritance —
/// see the design notes on polymorphism without inheritance).
#[derive(Debug)]
pub struct BaseProvider {
    pub provider_name: &'static str,
    pub capabilities: Capabilities,
}

impl BaseProvider {
    pub fn new(provider_name: &'static str, capabilities: Capabilities) -> Self {
        Self {
            provider_name,
            capabilities,
        }
    }

    /// Constructs a typed error, deriving `retriable` per the shared rule.
    pub fn new_error(
        &self,
        kind: ErrorKind,
        vendor_code: Option<&str>,
        message: impl Into<String>,
        http_status: Option<u16>,
    ) -> GatewayError {
        let mut err = GatewayError::new(kind, message);
        if let Some(code) = vendor_code {
            err = err.with_vendor_code(code);
        }
        if let Some(status) = http_status {
            err = err.with_http_status(status);
        }
        err.retriable = self.is_retriable_raw(vendor_code, http_status, &err.message);
        err
    }

    fn is_retriable_raw(&self, vendor_code: Option<&str>, http_status: Option<u16>, message: &str) -> bool {
        if let Some(code) = vendor_code
            && self.capabilities.is_retryable_vendor_code(code)
        {
            return true;
        }
        if let Some(status) = http_status
            && (status == 408 || status == 429 || status >= 500)
        {
            return true;
        }
        let lower = message.to_lowercase();
        GatewayError::NETWORK_KEYWORDS.iter().any(|kw| lower.contains(kw))
    }

    /// `isRetriable`: re-derives the same rule from an already-constructed
    /// error, consulting the vendor code carried in `meta["vendor_code"]`
    /// only via the error's own `vendor_code` field.
    pub fn is_retriable(&self, err: &GatewayError) -> bool {
        self.is_retriable_raw(err.vendor_code.as_deref(), err.http_status, &err.message)
    }

    /// Executes `op`, retrying on retriable failures up to
    /// `capabilities.max_retries` additional attempts with exponential
    /// backoff and full jitter in `[0.5, 1.5)`.
    pub async fn with_retry<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.capabilities.max_retries;
        let mut last_err: Option<GatewayError> = None;
        for attempt in 0..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let retriable = err.retriable;
                    last_err = Some(err);
                    if !retriable || attempt == attempts {
                        break;
                    }
                    let delay = backoff_delay(attempt);
                    tokio::time::sleep(delay).await;
                }
            }
        }
        let last = last_err.expect("loop runs at least once");
        if last.retriable {
            Err(GatewayError::retry_exhausted(&last))
        } else {
            Err(last)
        }
    }

    /// Strips a trailing dot and lowercases a zone or record name.
    pub fn normalize_name(name: &str) -> String {
        name.trim_end_matches('.').to_lowercase()
    }

    /// Strips wrapping double quotes from a TXT-style value, if present.
    pub fn unquote(value: &str) -> String {
        let trimmed = value.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            trimmed[1..trimmed.len() - 1].replace("\\\"", "\"")
        } else {
            trimmed.to_string()
        }
    }

    /// Wraps a value in double quotes, escaping embedded quotes, for
    /// vendors that require wire-format TXT quoting.
    pub fn quote(value: &str) -> String {
        format!("\"{}\"", value.replace('"', "\\\""))
    }

    /// Converts a canonical FQDN to a vendor host-relative name: `@` for
    /// the apex, the leftmost label(s) otherwise.
    pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
        let full = Self::normalize_name(full_name);
        let zone = Self::normalize_name(zone_name);
        if full == zone {
            "@".to_string()
        } else if let Some(prefix) = full.strip_suffix(&format!(".{zone}")) {
            prefix.to_string()
        } else {
            full
        }
    }

    /// Converts a vendor host-relative name back to a canonical FQDN.
    pub fn relative_to_full_name(relative: &str, zone_name: &str) -> String {
        let zone = Self::normalize_name(zone_name);
        if relative.is_empty() || relative == "@" {
            zone
        } else {
            format!("{}.{}", relative.to_lowercase(), zone)
        }
    }

    /// Client-side pagination: the authoritative slicing semantics for
    /// every `paging=client` adapter.
    pub fn paginate_client<T: Clone>(items: &[T], page: u32, page_size: u32) -> Vec<T> {
        let page = page.max(1) as usize;
        let page_size = page_size.max(1) as usize;
        let start = (page - 1) * page_size;
        if start >= items.len() {
            return Vec::new();
        }
        let end = (start + page_size).min(items.len());
        items[start..end].to_vec()
    }

    /// Client-side filtering: the authoritative predicate semantics for
    /// every `paging=client` adapter (property 4 in the testable
    /// properties list — idempotent and deterministic for a given input).
    pub fn filter_records_client(items: &[DnsRecord], query: &RecordQuery) -> Vec<DnsRecord> {
        items
            .iter()
            .filter(|r| {
                if let Some(keyword) = &query.keyword {
                    let kw = keyword.to_lowercase();
                    let haystack = format!(
                        "{} {} {} {}",
                        r.name,
                        r.record_type,
                        r.value,
                        r.remark.as_deref().unwrap_or("")
                    )
                    .to_lowercase();
                    if !haystack.contains(&kw) {
                        return false;
                    }
                }
                if let Some(sub) = &query.sub_domain
                    && !r.name.to_lowercase().contains(&sub.to_lowercase())
                {
                    return false;
                }
                if let Some(t) = &query.record_type
                    && !r.record_type.eq_ignore_ascii_case(t)
                {
                    return false;
                }
                if let Some(v) = &query.value
                    && !r.value.to_lowercase().contains(&v.to_lowercase())
                {
                    return false;
                }
                if let Some(line) = &query.line
                    && r.line.as_deref() != Some(line.as_str())
                {
                    return false;
                }
                if let Some(status) = query.status
                    && r.status != Some(status)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }
}

/// `min(maxDelay, base * 2^attempt * U[0.5, 1.5))`.
pub fn backoff_delay(attempt: u32) -> std::time::Duration {
    let exp = RETRY_BASE.as_millis() as f64 * 2f64.powi(attempt as i32);
    let jitter = rand::thread_rng().gen_range(0.5..1.5);
    let millis = (exp * jitter).min(RETRY_MAX_DELAY.as_millis() as f64);
    std::time::Duration::from_millis(millis as u64)
}
