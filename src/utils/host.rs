use log::warn;

use crate::constants::FALLBACK_HOSTNAME;

/// Hostname used to name the archive and key the processor output.
///
/// An explicit, non-blank `target_name` wins; otherwise the system hostname
/// is used, falling back to `localhost` when it cannot be read.
pub fn determine_hostname(target_name: Option<&str>) -> String {
    if let Some(name) = target_name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                FALLBACK_HOSTNAME.to_string()
            } else {
                name
            }
        }
        Err(e) => {
            warn!("Failed to get hostname: {}", e);
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_name_overrides_system_hostname() {
        assert_eq!(determine_hostname(Some("db01.example.com")), "db01.example.com");
    }

    #[test]
    fn test_blank_target_name_is_ignored() {
        let system = determine_hostname(None);
        assert_eq!(determine_hostname(Some("   ")), system);
        assert!(!system.is_empty());
    }
}
