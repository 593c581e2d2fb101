pub struct DefaultsConfig {
    pub sleep_secs: u64,
    pub max_polls: Option<u32>,
    pub poll_timeout_secs: Option<u64>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            sleep_secs: 5,
            max_polls: None,
            poll_timeout_secs: None,
        }
    }
}
