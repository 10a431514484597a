//! Resolves `--config`/`--out` into a loaded [`ResolvedConfig`] plus the
//! storage/loader/engine stack every subcommand needs, mirroring the
//! teacher CLI's workspace-bootstrap session object.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use staticql::{Config, ConfigResolver, Engine, FileRecordLoader, LocalFsStorage, ParserRegistry, RecordLoader, ResolvedConfig, Storage};

use crate::error::{CliError, ExitStatus};

pub const DEFAULT_CONFIG_PATH: &str = "staticql.config.yaml";
pub const DEFAULT_OUT_DIR: &str = "./index";

pub struct CliSession {
    pub resolved: Arc<ResolvedConfig>,
    pub storage: Arc<dyn Storage>,
    pub engine: Engine,
}

impl CliSession {
    pub fn bootstrap(config_path: Option<String>, out_dir: Option<String>) -> Result<Self, CliError> {
        let config_path = PathBuf::from(config_path.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()));
        let text = fs::read_to_string(&config_path).map_err(|err| {
            CliError::new(format!("failed to read config at {}: {err}", config_path.display()), ExitStatus::Config)
        })?;

        let mut config = load_config(&config_path, &text)?;
        if let Some(out_dir) = out_dir {
            config.output_root = PathBuf::from(out_dir);
        } else if config.output_root == PathBuf::from(".") {
            config.output_root = PathBuf::from(DEFAULT_OUT_DIR);
        }

        let resolved = ConfigResolver::new(config).resolve()?;
        let storage: Arc<dyn Storage> = Arc::new(LocalFsStorage::new("."));
        let parsers = Arc::new(ParserRegistry::default());
        let loader: Arc<dyn RecordLoader> = Arc::new(FileRecordLoader::new(resolved.clone(), storage.clone(), parsers));
        let engine = Engine::new(resolved.clone(), loader);

        Ok(Self { resolved, storage, engine })
    }
}

fn load_config(path: &Path, text: &str) -> Result<Config, CliError> {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let config = if is_json {
        Config::from_json_str(text)?
    } else {
        Config::from_yaml_str(text)?
    };
    Ok(config)
}
