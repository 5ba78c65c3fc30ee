//! # dns-gateway-provider
//!
//! A unified DNS control-plane gateway: one async trait and one canonical
//! data model in front of thirteen heterogeneous vendor DNS APIs, hiding
//! per-vendor signing schemes, identifier conventions, pagination modes,
//! record-value encodings, and line/status semantics.
//!
//! ## Supported Providers
//!
//! | Provider | Feature Flag | Auth Method |
//! |----------|-------------|-------------|
//! | [Cloudflare](https://www.cloudflare.com/) | `cloudflare` | Bearer Token |
//! | [Aliyun DNS](https://www.aliyun.com/product/dns) | `aliyun` | HMAC-SHA1 |
//! | [DNSPod (Tencent Cloud)](https://www.dnspod.cn/) | `dnspod` | TC3-HMAC-SHA256 / MD5 token |
//! | [Huawei Cloud DNS](https://www.huaweicloud.com/product/dns.html) | `huaweicloud` | SDK-HMAC-SHA256 |
//! | [Baidu Cloud DNS](https://cloud.baidu.com/product/dns.html) | `baidu` | BCE v1 |
//! | [West.cn](https://www.west.cn/) | `westcn` | MD5 token |
//! | [Volcengine DNS](https://www.volcengine.com/product/dns) | `volcengine` | TC3-HMAC-SHA256 |
//! | [JDCloud DNS](https://www.jdcloud.com/) | `jdcloud` | TC3-HMAC-SHA256 |
//! | [DNSLA](https://www.dns.la/) | `dnsla` | HTTP Basic |
//! | [NameSilo](https://www.namesilo.com/) | `namesilo` | API key query param |
//! | [PowerDNS](https://www.powerdns.com/) | `powerdns` | `X-API-Key` header |
//! | [Spaceship](https://www.spaceship.com/) | `spaceship` | API key headers |
//!
//! ## Feature Flags
//!
//! ### Provider Selection
//!
//! - **`all-providers`** *(default)* — enable every adapter listed above.
//! - Each adapter also has its own flag (`cloudflare`, `aliyun`, `dnspod`,
//!   `huaweicloud`, `baidu`, `westcn`, `volcengine`, `jdcloud`, `dnsla`,
//!   `namesilo`, `powerdns`, `spaceship`) for a trimmed build.
//!
//! ### TLS Backend
//!
//! - **`native-tls`** *(default)* — use the platform's native TLS implementation.
//! - **`rustls`** — use rustls. Recommended for cross-compilation and Android targets.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//! use dns_gateway_provider::{DnsFacade, FacadeConfig, ProviderKind, ServiceContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let facade = DnsFacade::new(FacadeConfig::default());
//!
//!     let mut secrets = BTreeMap::new();
//!     secrets.insert("apiToken".to_string(), "your-token".to_string());
//!     let ctx = ServiceContext::new(ProviderKind::Cloudflare, secrets)
//!         .with_credential_key("tenant-1");
//!
//!     if !facade.check_auth(&ctx).await {
//!         return Err("credentials rejected".into());
//!     }
//!
//!     let zones = facade.get_zones(&ctx, 1, 20, None).await?;
//!     for zone in &zones.items {
//!         println!("{} ({:?})", zone.name, zone.status);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every gateway operation returns [`Result<T>`] wrapping a
//! [`GatewayError`], whose [`ErrorKind`] enumerates the closed set of
//! failure modes the gateway normalizes vendor errors into — auth
//! failure, missing zone/record, rate limiting, vendor-specific errors,
//! and more. `GatewayError::retriable` tells callers whether the facade
//! already exhausted its own retry budget or whether the failure is
//! permanent.

mod base;
mod cache;
mod error;
mod facade;
mod provider;
mod providers;
mod registry;
mod resolver;
mod signing;
#[cfg(test)]
mod testing;
mod transport;
mod types;
mod utils;

pub use error::{ErrorKind, GatewayError, Result};
pub use facade::{DnsFacade, FacadeConfig};
pub use provider::{Page, Provider};
pub use cache::InvalidateScope;
pub use types::{
    AuthField, AuthFieldKind, Capabilities, DnsLine, DnsRecord, Meta, PagingMode, ProviderKind,
    RecordParams, RecordQuery, RecordStatus, RemarkMode, ServiceContext, Zone, ZoneStatus,
};

pub use utils::datetime;
