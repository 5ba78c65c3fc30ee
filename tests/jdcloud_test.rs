//! JDCloud DNS integration tests.
//!
//! ```bash
//! JDCLOUD_ACCESS_KEY_ID=xxx JDCLOUD_SECRET_ACCESS_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test jdcloud_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Jdcloud,
    [
        ("accessKeyId", "JDCLOUD_ACCESS_KEY_ID"),
        ("secretAccessKey", "JDCLOUD_SECRET_ACCESS_KEY"),
    ]
);
