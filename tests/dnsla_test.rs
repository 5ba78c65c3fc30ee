//! DNSLA integration tests.
//!
//! ```bash
//! DNSLA_API_ID=xxx DNSLA_API_SECRET=xxx TEST_DOMAIN=example.com \
//!     cargo test --test dnsla_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Dnsla,
    [("apiId", "DNSLA_API_ID"), ("apiSecret", "DNSLA_API_SECRET")]
);
