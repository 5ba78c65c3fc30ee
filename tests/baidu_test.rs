//! Baidu Cloud DNS integration tests.
//!
//! ```bash
//! BAIDU_ACCESS_KEY_ID=xxx BAIDU_SECRET_ACCESS_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test baidu_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Baidu,
    [
        ("accessKeyId", "BAIDU_ACCESS_KEY_ID"),
        ("secretAccessKey", "BAIDU_SECRET_ACCESS_KEY"),
    ]
);
