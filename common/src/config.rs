use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    pub display_interval_ms: u64,
    pub upload_interval_ms: u64,
    pub idle_delay_ms: u64,
    pub boot_banner_ms: u64,
    pub error_hold_ms: u64,
    pub wifi_connect_attempts: u32,
    pub wifi_poll_interval_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            display_interval_ms: 2_000,
            upload_interval_ms: 10_000,
            idle_delay_ms: 100,
            boot_banner_ms: 2_000,
            error_hold_ms: 3_000,
            wifi_connect_attempts: 30,
            wifi_poll_interval_ms: 500,
            http_timeout_ms: 15_000,
        }
    }
}

// Baked in at build time; there is no runtime reconfiguration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub upload_url: String,
    pub api_key: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("CHANGE_ME").to_string(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("CHANGE_ME").to_string(),
            upload_url: option_env!("UPLOAD_URL")
                .unwrap_or("http://192.168.0.195:8000/api/energy-data/")
                .to_string(),
            api_key: option_env!("API_KEY").unwrap_or("CHANGE_ME").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intervals_match_device_cadence() {
        let config = MeterConfig::default();

        assert_eq!(config.display_interval_ms, 2_000);
        assert_eq!(config.upload_interval_ms, 10_000);
        // 30 x 500 ms, roughly a 15 s association timeout.
        assert_eq!(config.wifi_connect_attempts, 30);
        assert_eq!(config.wifi_poll_interval_ms, 500);
    }
}
