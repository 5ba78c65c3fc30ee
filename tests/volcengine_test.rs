//! Volcengine DNS integration tests.
//!
//! ```bash
//! VOLCENGINE_ACCESS_KEY_ID=xxx VOLCENGINE_SECRET_ACCESS_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test volcengine_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Volcengine,
    [
        ("accessKeyId", "VOLCENGINE_ACCESS_KEY_ID"),
        ("secretAccessKey", "VOLCENGINE_SECRET_ACCESS_KEY"),
    ]
);
