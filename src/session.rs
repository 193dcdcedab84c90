//! Read-only session context handed to the orchestrators.
//!
//! The kiosk's site and device identity are resolved once at startup and
//! passed in explicitly; nothing in the capture path looks them up again.

use sha2::{Digest, Sha256};

/// Prefix for device ids derived from the host name.
const DERIVED_DEVICE_PREFIX: &str = "KIOSK-";

/// Identity attached to every submission from this kiosk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    site_id: String,
    device_id: String,
}

impl SessionContext {
    pub fn new(site_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            device_id: device_id.into(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Derive a site id from the attendance backend URL.
///
/// Strips the scheme and every `/`, so `https://erp.example.com/` becomes
/// `erp.example.com`.
pub fn site_id_from_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.replace('/', "")
}

/// Stable device id for a host: `KIOSK-` plus 8 hex chars of SHA-256.
pub fn device_id_for_host(host: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(host.as_bytes());
    let digest = hasher.finalize();
    format!(
        "{}{}",
        DERIVED_DEVICE_PREFIX,
        hex::encode_upper(&digest[..4])
    )
}

/// Device id for this machine, derived from its host name.
pub fn local_device_id() -> String {
    let host = hostname().unwrap_or_else(|| "localhost".to_string());
    device_id_for_host(&host)
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is valid for writes of buf.len() bytes.
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty())
}
