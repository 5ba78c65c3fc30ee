//! Cloudflare integration tests.
//!
//! ```bash
//! CLOUDFLARE_API_TOKEN=xxx TEST_DOMAIN=example.com \
//!     cargo test --test cloudflare_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(ProviderKind::Cloudflare, [("apiToken", "CLOUDFLARE_API_TOKEN")]);
