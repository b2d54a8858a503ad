//! Orchestrator configuration
//!
//! Operator-configured knobs for a tick: the schedule-binding tag key, the
//! ASG scheduled-action name prefix, the transport-size threshold past
//! which the orchestrator strips the worker snapshot (§4.6), and the set
//! of enabled services/regions to cross with the configured accounts.
//! Built as a `Default` + `with_*` builder, loadable from a `.env` file
//! via `dotenv` before `main.rs` reads process environment overrides.

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub schedule_tag_key: String,
    pub asg_action_name_prefix: String,
    pub transport_threshold_bytes: usize,
    pub enabled_services: Vec<String>,
    pub accounts: Vec<String>,
    pub regions: Vec<String>,
    pub worker_deadline_secs: u64,
    pub start_tags: std::collections::BTreeMap<String, String>,
    pub stop_tags: std::collections::BTreeMap<String, String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            schedule_tag_key: "Schedule".to_string(),
            asg_action_name_prefix: "IS-".to_string(),
            transport_threshold_bytes: 200_000,
            enabled_services: vec!["ec2".to_string()],
            accounts: Vec::new(),
            regions: Vec::new(),
            worker_deadline_secs: 900,
            start_tags: std::collections::BTreeMap::new(),
            stop_tags: std::collections::BTreeMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Loads overrides from process environment variables, after `dotenv`
    /// has had a chance to populate them from a `.env` file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var("IS_SCHEDULE_TAG_KEY") {
            config.schedule_tag_key = key;
        }
        if let Ok(prefix) = std::env::var("IS_ASG_ACTION_PREFIX") {
            config.asg_action_name_prefix = prefix;
        }
        if let Ok(services) = std::env::var("IS_ENABLED_SERVICES") {
            config.enabled_services = services.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(accounts) = std::env::var("IS_ACCOUNTS") {
            config.accounts = accounts.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(regions) = std::env::var("IS_REGIONS") {
            config.regions = regions.split(',').map(|s| s.trim().to_string()).collect();
        }
        config
    }

    pub fn with_schedule_tag_key(mut self, key: impl Into<String>) -> Self {
        self.schedule_tag_key = key.into();
        self
    }

    pub fn with_asg_action_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asg_action_name_prefix = prefix.into();
        self
    }

    pub fn with_accounts(mut self, accounts: Vec<String>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_enabled_services(mut self, services: Vec<String>) -> Self {
        self.enabled_services = services;
        self
    }

    /// The cross product of services × accounts × regions that the
    /// orchestrator fans a worker out to (§4.6 step 2).
    pub fn targets(&self) -> Vec<(String, String, String)> {
        let mut targets = Vec::new();
        for service in &self.enabled_services {
            for account in &self.accounts {
                for region in &self.regions {
                    targets.push((service.clone(), account.clone(), region.clone()));
                }
            }
        }
        targets
    }
}
