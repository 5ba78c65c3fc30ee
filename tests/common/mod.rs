//! Shared integration-test harness: every `#[ignore]`-gated test in this
//! `tests/` directory builds a [`TestContext`] from environment variables
//! and a `TEST_DOMAIN`, then drives the gateway's [`DnsFacade`] against
//! whichever upstream the environment actually has credentials for.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::env;

use dns_gateway_provider::{DnsFacade, FacadeConfig, ProviderKind, ServiceContext};

/// Skips the calling test when any of the listed environment variables
/// is unset, instead of failing the whole suite on a developer machine
/// that only has a subset of vendor credentials configured.
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+ $(,)?) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("skipping: missing environment variable {}", $var);
                return;
            }
        )+
    };
}

/// Unwraps a `Some`, returning from the enclosing test (rather than
/// panicking) when it isn't — used after `skip_if_no_credentials!` has
/// already established the test should run, so a `None` here signals a
/// real failure worth reporting via an assertion message.
#[macro_export]
macro_rules! require_some {
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), $($msg)+);
        let Some(val) = opt else { return };
        val
    }};
}

#[macro_export]
macro_rules! require_ok {
    ($expr:expr) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got {:?}", res.err());
        let Ok(val) = res else { return };
        val
    }};
    ($expr:expr, $($msg:tt)+) => {{
        let res = $expr;
        assert!(res.is_ok(), "{}: {:?}", format_args!($($msg)+), res.err());
        let Ok(val) = res else { return };
        val
    }};
}

pub fn generate_test_record_name() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("_test-{}", &uuid.to_string()[..8])
}

/// Wraps a configured facade, a credential context for one vendor, and
/// the zone under test. Resolution of the zone ID is lazy and cached,
/// matching how a real caller would use the facade (resolve once, then
/// operate on the zone ID for the rest of the session).
pub struct TestContext {
    pub facade: DnsFacade,
    pub ctx: ServiceContext,
    pub domain: String,
    pub zone_id: Option<String>,
}

impl TestContext {
    /// Builds a context from `secret_vars` (gateway secret key, env var
    /// name pairs) plus `TEST_DOMAIN`. Returns `None` if any is unset;
    /// callers combine this with `skip_if_no_credentials!` so the
    /// `None` path is only reached after the test has already decided
    /// to skip, never reported as a failure.
    pub fn from_env(kind: ProviderKind, secret_vars: &[(&str, &str)]) -> Option<Self> {
        let mut secrets = BTreeMap::new();
        for (key, env_var) in secret_vars {
            secrets.insert((*key).to_string(), env::var(env_var).ok()?);
        }
        let domain = env::var("TEST_DOMAIN").ok()?;
        let ctx = ServiceContext::new(kind, secrets).with_credential_key("integration-test");
        Some(Self {
            facade: DnsFacade::new(FacadeConfig::default()),
            ctx,
            domain,
            zone_id: None,
        })
    }

    pub async fn resolve_zone(&mut self) -> Option<String> {
        if let Some(id) = &self.zone_id {
            return Some(id.clone());
        }
        let zone = self.facade.get_zone(&self.ctx, &self.domain).await.ok()?;
        self.zone_id = Some(zone.id.clone());
        Some(zone.id)
    }

    /// Removes any leftover `_test-*` records from a previous failed run.
    pub async fn cleanup_test_records(&self, zone_id: &str) {
        let query = dns_gateway_provider::RecordQuery {
            keyword: Some("_test-".to_string()),
            ..Default::default()
        };
        if let Ok(page) = self.facade.get_records(&self.ctx, zone_id, &query).await {
            for record in page.items {
                if record.name.contains("_test-") {
                    let _ = self.facade.delete_record(&self.ctx, zone_id, &record.id).await;
                }
            }
        }
    }
}

/// Expands to the common check-auth / resolve-zone / record-CRUD suite
/// for one vendor. `$kind` is the `ProviderKind`; `$secrets` pairs each
/// gateway secret key with the environment variable that supplies it.
#[macro_export]
macro_rules! vendor_integration_tests {
    ($kind:expr, [$(($secret_key:literal, $env_var:literal)),+ $(,)?]) => {
        fn test_ctx() -> Option<common::TestContext> {
            common::TestContext::from_env($kind, &[$(($secret_key, $env_var)),+])
        }

        #[tokio::test]
        #[ignore = "integration test: requires vendor credentials and TEST_DOMAIN"]
        async fn check_auth_succeeds_with_valid_credentials() {
            skip_if_no_credentials!($($env_var),+, "TEST_DOMAIN");
            let Some(tc) = test_ctx() else { return };
            assert!(tc.facade.check_auth(&tc.ctx).await, "credentials should validate against the live API");
        }

        #[tokio::test]
        #[ignore = "integration test: requires vendor credentials and TEST_DOMAIN"]
        async fn get_zone_resolves_by_name() {
            skip_if_no_credentials!($($env_var),+, "TEST_DOMAIN");
            let Some(mut tc) = test_ctx() else { return };
            let zone_id = require_some!(tc.resolve_zone().await, "test domain should resolve to a zone");
            let zone = require_ok!(tc.facade.get_zone(&tc.ctx, &zone_id).await);
            assert_eq!(zone.name, tc.domain);
        }

        #[tokio::test]
        #[ignore = "integration test: requires vendor credentials and TEST_DOMAIN"]
        async fn record_crud_round_trip() {
            skip_if_no_credentials!($($env_var),+, "TEST_DOMAIN");
            let Some(mut tc) = test_ctx() else { return };
            let zone_id = require_some!(tc.resolve_zone().await, "test domain should resolve to a zone");
            tc.cleanup_test_records(&zone_id).await;

            let params = dns_gateway_provider::RecordParams {
                name: common::generate_test_record_name(),
                record_type: "TXT".to_string(),
                value: "integration-test".to_string(),
                ttl: 600,
                ..Default::default()
            };

            let created = require_ok!(tc.facade.create_record(&tc.ctx, &zone_id, &params).await, "create_record failed");
            assert_eq!(created.value, "integration-test");

            let fetched = require_ok!(tc.facade.get_record(&tc.ctx, &zone_id, &created.id).await, "get_record failed");
            assert_eq!(fetched.id, created.id);

            let mut updated_params = params.clone();
            updated_params.ttl = 900;
            let updated = require_ok!(
                tc.facade.update_record(&tc.ctx, &zone_id, &created.id, &updated_params).await,
                "update_record failed"
            );
            assert_eq!(updated.ttl, 900);

            let deleted = require_ok!(tc.facade.delete_record(&tc.ctx, &zone_id, &updated.id).await, "delete_record failed");
            assert!(deleted);
        }
    };
}
