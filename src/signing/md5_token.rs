//! MD5 token auth, shared by West.cn and DNSPod's legacy Token API:
//! a plaintext `time=` field plus `token = md5(username + apiPassword + time)`.

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

/// Returns `(time, token)` ready to be inserted into the request form body.
pub fn sign(username: &str, api_password: &str, now: DateTime<Utc>) -> (String, String) {
    let time = now.timestamp().to_string();
    let mut hasher = Md5::new();
    hasher.update(username.as_bytes());
    hasher.update(api_password.as_bytes());
    hasher.update(time.as_bytes());
    let token = hex::encode(hasher.finalize());
    (time, token)
}
