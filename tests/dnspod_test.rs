//! DNSPod integration tests, TC3 credentials.
//!
//! ```bash
//! DNSPOD_SECRET_ID=xxx DNSPOD_SECRET_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test dnspod_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::DnspodTc3,
    [
        ("secretId", "DNSPOD_SECRET_ID"),
        ("secretKey", "DNSPOD_SECRET_KEY"),
    ]
);
