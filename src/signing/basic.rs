//! HTTP Basic auth, used by DNSLA: `Authorization: Basic base64(id:secret)`.

use base64::Engine;

pub fn header_value(api_id: &str, api_secret: &str) -> String {
    let raw = format!("{api_id}:{api_secret}");
    format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_id_and_secret() {
        let header = header_value("abc", "def");
        assert!(header.starts_with("Basic "));
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(header.strip_prefix("Basic ").unwrap())
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "abc:def");
    }
}
