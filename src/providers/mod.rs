//! Built-in vendor adapters (C5) and their registration with the registry.

#[cfg(feature = "aliyun")]
mod aliyun;
#[cfg(feature = "baidu")]
mod baidu;
#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "dnsla")]
mod dnsla;
#[cfg(feature = "dnspod")]
mod dnspod_legacy;
#[cfg(feature = "dnspod")]
mod dnspod_tc3;
#[cfg(feature = "huaweicloud")]
mod huawei;
#[cfg(feature = "jdcloud")]
mod jdcloud;
#[cfg(feature = "namesilo")]
mod namesilo;
#[cfg(feature = "powerdns")]
mod powerdns;
#[cfg(feature = "spaceship")]
mod spaceship;
#[cfg(feature = "volcengine")]
mod volcengine;
#[cfg(feature = "westcn")]
mod westcn;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::provider::Provider;
use crate::types::{Capabilities, ProviderKind, ServiceContext};

type Constructor = Box<dyn Fn(&ServiceContext) -> Result<Arc<dyn Provider>> + Send + Sync>;

macro_rules! ctor {
    ($module:ident, $adapter:ident) => {
        Box::new(|ctx: &ServiceContext| {
            $module::$adapter::new(ctx).map(|p| Arc::new(p) as Arc<dyn Provider>)
        })
    };
}

pub(crate) fn register_builtins(constructors: &mut HashMap<ProviderKind, Constructor>) {
    #[cfg(feature = "cloudflare")]
    constructors.insert(ProviderKind::Cloudflare, ctor!(cloudflare, CloudflareProvider));
    #[cfg(feature = "aliyun")]
    constructors.insert(ProviderKind::Aliyun, ctor!(aliyun, AliyunProvider));
    #[cfg(feature = "dnspod")]
    constructors.insert(ProviderKind::DnspodTc3, ctor!(dnspod_tc3, DnspodTc3Provider));
    #[cfg(feature = "dnspod")]
    constructors.insert(ProviderKind::DnspodLegacy, ctor!(dnspod_legacy, DnspodLegacyProvider));
    #[cfg(feature = "huaweicloud")]
    constructors.insert(ProviderKind::Huawei, ctor!(huawei, HuaweiProvider));
    #[cfg(feature = "baidu")]
    constructors.insert(ProviderKind::Baidu, ctor!(baidu, BaiduProvider));
    #[cfg(feature = "westcn")]
    constructors.insert(ProviderKind::Westcn, ctor!(westcn, WestcnProvider));
    #[cfg(feature = "volcengine")]
    constructors.insert(ProviderKind::Volcengine, ctor!(volcengine, VolcengineProvider));
    #[cfg(feature = "jdcloud")]
    constructors.insert(ProviderKind::Jdcloud, ctor!(jdcloud, JdcloudProvider));
    #[cfg(feature = "dnsla")]
    constructors.insert(ProviderKind::Dnsla, ctor!(dnsla, DnslaProvider));
    #[cfg(feature = "namesilo")]
    constructors.insert(ProviderKind::Namesilo, ctor!(namesilo, NamesiloProvider));
    #[cfg(feature = "powerdns")]
    constructors.insert(ProviderKind::Powerdns, ctor!(powerdns, PowerdnsProvider));
    #[cfg(feature = "spaceship")]
    constructors.insert(ProviderKind::Spaceship, ctor!(spaceship, SpaceshipProvider));
}

pub(crate) fn capabilities_for(kind: ProviderKind) -> Option<Capabilities> {
    match kind {
        #[cfg(feature = "cloudflare")]
        ProviderKind::Cloudflare => Some(cloudflare::capabilities()),
        #[cfg(feature = "aliyun")]
        ProviderKind::Aliyun => Some(aliyun::capabilities()),
        #[cfg(feature = "dnspod")]
        ProviderKind::DnspodTc3 => Some(dnspod_tc3::capabilities()),
        #[cfg(feature = "dnspod")]
        ProviderKind::DnspodLegacy => Some(dnspod_legacy::capabilities()),
        #[cfg(feature = "huaweicloud")]
        ProviderKind::Huawei => Some(huawei::capabilities()),
        #[cfg(feature = "baidu")]
        ProviderKind::Baidu => Some(baidu::capabilities()),
        #[cfg(feature = "westcn")]
        ProviderKind::Westcn => Some(westcn::capabilities()),
        #[cfg(feature = "volcengine")]
        ProviderKind::Volcengine => Some(volcengine::capabilities()),
        #[cfg(feature = "jdcloud")]
        ProviderKind::Jdcloud => Some(jdcloud::capabilities()),
        #[cfg(feature = "dnsla")]
        ProviderKind::Dnsla => Some(dnsla::capabilities()),
        #[cfg(feature = "namesilo")]
        ProviderKind::Namesilo => Some(namesilo::capabilities()),
        #[cfg(feature = "powerdns")]
        ProviderKind::Powerdns => Some(powerdns::capabilities()),
        #[cfg(feature = "spaceship")]
        ProviderKind::Spaceship => Some(spaceship::capabilities()),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}

/// Shared by every adapter: reads a required secret or raises
/// `MissingCredentials` instead of panicking on a bad `ServiceContext`.
pub(crate) fn require_secret(ctx: &ServiceContext, key: &str) -> Result<String> {
    ctx.secrets
        .get(key)
        .cloned()
        .ok_or_else(|| crate::error::GatewayError::missing_credentials(key))
}
