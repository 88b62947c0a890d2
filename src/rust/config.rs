use crate::errors::{MapError, MapResult, MapResultExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Alignment backend from the hhsuite family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Iterative HMM-HMM search (`hhblits`)
    #[default]
    HHblits,
    /// Single-pass HMM-HMM search (`hhsearch`)
    HHsearch,
}

impl Backend {
    pub fn is_blits(&self) -> bool {
        matches!(self, Backend::HHblits)
    }

    /// Name of the hhsuite executable for this backend
    pub fn program(&self) -> &'static str {
        match self {
            Backend::HHblits => "hhblits",
            Backend::HHsearch => "hhsearch",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program())
    }
}

/// Window and backend settings for one fragment map computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Shortest window tried at each start
    pub window_min: usize,
    /// Longest window tried at each start
    pub window_max: usize,
    /// Distance between consecutive window starts
    pub window_increment: usize,
    /// Backend used for profile construction and fragment search
    #[serde(default)]
    pub backend: Backend,
    /// Worker pool settings
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Performance-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Number of search workers
    pub num_workers: Option<usize>,
    /// Capacity of the job and report queues
    pub queue_capacity: usize,
    /// Enable search metrics
    pub enable_metrics: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            num_workers: None, // Use system default
            queue_capacity: 10,
            enable_metrics: true,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            window_min: 30,
            window_max: 35,
            window_increment: 5,
            backend: Backend::HHblits,
            performance: PerformanceConfig::default(),
        }
    }
}

impl MapConfig {
    /// Create a new configuration with validation
    pub fn new(
        window_min: usize,
        window_max: usize,
        window_increment: usize,
        backend: Backend,
    ) -> MapResult<Self> {
        let config = Self {
            window_min,
            window_max,
            window_increment,
            backend,
            performance: PerformanceConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MapResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: MapConfig = serde_json::from_reader(std::io::BufReader::new(file))
            .with_field_context("config", &format!("reading {}", path.as_ref().display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> MapResult<()> {
        if self.window_min == 0 {
            return Err(MapError::ConfigurationError {
                field: "window_min".to_string(),
                message: "Minimum window length must be greater than 0".to_string(),
            });
        }

        if self.window_min > self.window_max {
            return Err(MapError::ConfigurationError {
                field: "window_max".to_string(),
                message: format!(
                    "Maximum window length {} is smaller than minimum {}",
                    self.window_max, self.window_min
                ),
            });
        }

        if self.window_increment == 0 {
            return Err(MapError::ConfigurationError {
                field: "window_increment".to_string(),
                message: "Window increment must be greater than 0".to_string(),
            });
        }

        if self.performance.num_workers == Some(0) {
            return Err(MapError::ConfigurationError {
                field: "num_workers".to_string(),
                message: "Number of workers must be greater than 0".to_string(),
            });
        }

        if self.performance.queue_capacity == 0 {
            return Err(MapError::ConfigurationError {
                field: "queue_capacity".to_string(),
                message: "Queue capacity must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the number of workers to use
    pub fn effective_worker_count(&self) -> usize {
        self.performance
            .num_workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .max(1)
    }
}

/// Configuration builder for more complex setups
pub struct MapConfigBuilder {
    config: MapConfig,
}

impl MapConfigBuilder {
    /// Start from the default windows (30..=35, step 5, hhblits)
    pub fn new() -> Self {
        Self { config: MapConfig::default() }
    }

    /// Set the window length range
    pub fn windows(mut self, min: usize, max: usize) -> Self {
        self.config.window_min = min;
        self.config.window_max = max;
        self
    }

    /// Set the distance between window starts
    pub fn window_increment(mut self, increment: usize) -> Self {
        self.config.window_increment = increment;
        self
    }

    /// Set the alignment backend
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    /// Set the number of search workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.performance.num_workers = Some(workers);
        self
    }

    /// Set the job and report queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.performance.queue_capacity = capacity;
        self
    }

    /// Enable or disable metrics
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.config.performance.enable_metrics = enable;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> MapResult<MapConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for MapConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.window_min, 30);
        assert_eq!(config.window_max, 35);
        assert_eq!(config.window_increment, 5);
        assert!(config.backend.is_blits());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        // min > max
        assert!(MapConfig::new(36, 35, 5, Backend::HHblits).is_err());

        // Zero increment
        assert!(MapConfig::new(30, 35, 0, Backend::HHblits).is_err());

        // Zero minimum
        assert!(MapConfig::new(0, 35, 5, Backend::HHblits).is_err());

        // min == max is fine
        assert!(MapConfig::new(30, 30, 1, Backend::HHsearch).is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = MapConfigBuilder::new()
            .windows(20, 25)
            .window_increment(2)
            .backend(Backend::HHsearch)
            .num_workers(4)
            .queue_capacity(3)
            .build()
            .unwrap();

        assert_eq!(config.window_min, 20);
        assert_eq!(config.window_max, 25);
        assert_eq!(config.backend, Backend::HHsearch);
        assert_eq!(config.effective_worker_count(), 4);
        assert_eq!(config.performance.queue_capacity, 3);

        assert!(MapConfigBuilder::new().num_workers(0).build().is_err());
        assert!(MapConfigBuilder::new().queue_capacity(0).build().is_err());
    }

    #[test]
    fn test_effective_worker_count_at_least_one() {
        assert!(MapConfig::default().effective_worker_count() >= 1);
    }

    #[test]
    fn test_config_from_json_file() -> MapResult<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"window_min": 10, "window_max": 12, "window_increment": 3, "backend": "hhsearch"}}"#
        )?;

        let config = MapConfig::from_json_file(file.path())?;
        assert_eq!(config.window_min, 10);
        assert_eq!(config.window_max, 12);
        assert_eq!(config.backend, Backend::HHsearch);
        assert_eq!(config.performance, PerformanceConfig::default());
        Ok(())
    }

    #[test]
    fn test_config_from_bad_json_file() -> MapResult<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"{{"window_min": "ten"}}"#)?;

        match MapConfig::from_json_file(file.path()) {
            Err(MapError::ConfigurationError { field, .. }) => assert_eq!(field, "config"),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::HHblits.program(), "hhblits");
        assert_eq!(serde_json::from_str::<Backend>(r#""hhsearch""#).unwrap(), Backend::HHsearch);
        assert!(serde_json::from_str::<Backend>(r#""psiblast""#).is_err());
        assert_eq!(Backend::HHsearch.to_string(), "hhsearch");
    }
}
