use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::RunConfig;
use crate::error::ConfigError;
use crate::generator::ArgTemplate;

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

/// Loads and validates a config file. Relative paths inside it are
/// resolved against the directory the file lives in.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse(&content, format)?;
    if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        resolve_paths(&mut config, base);
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<RunConfig, ConfigError> {
    let config = parse(content, format)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse(content: &str, format: ConfigFormat) -> Result<RunConfig, ConfigError> {
    Ok(match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    })
}

fn resolve_paths(config: &mut RunConfig, base: &Path) {
    for path in [
        &mut config.jobs.path,
        &mut config.manifests.successes,
        &mut config.manifests.failures,
        &mut config.options.output_directory,
    ] {
        if path.is_relative() && !path.as_os_str().is_empty() {
            *path = base.join(&*path);
        }
    }
}

pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.dispatch.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "dispatch.worker_count must be > 0".to_string(),
        });
    }
    if config.dispatch.chunk_size == 0 {
        return Err(ConfigError::Validation {
            message: "dispatch.chunk_size must be > 0".to_string(),
        });
    }
    if config.jobs.category_column.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "jobs.category_column must not be empty".to_string(),
        });
    }
    if config.manifests.successes == config.manifests.failures {
        return Err(ConfigError::Validation {
            message: "success and failure manifests must be different files".to_string(),
        });
    }
    if config.pipelines.is_empty() {
        return Err(ConfigError::Validation {
            message: "at least one pipeline must be configured".to_string(),
        });
    }

    for (category, pipeline) in &config.pipelines {
        let pipeline_name = pipeline.name.as_deref().unwrap_or(category);
        if pipeline.stages.is_empty() {
            return Err(ConfigError::Validation {
                message: format!("Pipeline '{}' has no stages", pipeline_name),
            });
        }

        let mut stage_names = HashSet::new();
        for stage in &pipeline.stages {
            let invalid = |reason: String| ConfigError::InvalidStage {
                pipeline: pipeline_name.to_string(),
                stage: stage.name.clone(),
                reason,
            };

            if !stage_names.insert(stage.name.as_str()) {
                return Err(invalid("Duplicate stage name".to_string()));
            }
            if stage.command.trim().is_empty() {
                return Err(invalid("Command must not be empty".to_string()));
            }
            if stage.timeout_secs == Some(0) {
                return Err(invalid("timeout_secs must be > 0".to_string()));
            }
            for arg in &stage.args {
                let template = ArgTemplate::new(arg.as_str());
                let unknown = template.unknown_placeholders(&config.options);
                if let Some(name) = unknown.first() {
                    return Err(invalid(format!(
                        "Unknown placeholder '{{{}}}' in argument '{}'",
                        name, arg
                    )));
                }
            }
        }
    }

    if config.default_timeout_secs == Some(0) {
        return Err(ConfigError::Validation {
            message: "default_timeout_secs must be > 0".to_string(),
        });
    }

    Ok(())
}
