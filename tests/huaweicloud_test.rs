//! Huawei Cloud DNS integration tests.
//!
//! ```bash
//! HUAWEICLOUD_ACCESS_KEY_ID=xxx HUAWEICLOUD_SECRET_ACCESS_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test huaweicloud_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Huawei,
    [
        ("accessKeyId", "HUAWEICLOUD_ACCESS_KEY_ID"),
        ("secretAccessKey", "HUAWEICLOUD_SECRET_ACCESS_KEY"),
    ]
);
