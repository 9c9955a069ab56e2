//! Configuration file for the `remesh` command.
//!
//! Every key is optional; command-line flags override the file.
//!
//! ```toml
//! input = "bunny.obj"
//! scale = 0.02
//! threads = 4
//!
//! [solver]
//! orientation_iterations = 24
//! target_faces = 2000
//! ```

use anyhow::{Context, Result};
use field_remesh::{Parallelism, RemeshConfig, SolverSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for a remeshing run.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Input mesh path.
	pub input: Option<PathBuf>,
	/// Output OBJ path.
	pub output: Option<PathBuf>,
	/// Target edge length; absent or non-positive means auto.
	pub scale: Option<f64>,
	/// Reverse the output winding convention.
	pub flip: bool,
	/// Worker threads, -1 or 0 for all cores.
	pub threads: Option<i64>,
	/// Field solver tuning.
	pub solver: SolverSettings,
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config = Self::parse(&content)
			.with_context(|| format!("Invalid config file: {}", path.display()))?;
		Ok(config)
	}

	fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).context("Failed to parse config TOML")?;
		config.solver.validate()?;
		Ok(config)
	}

	/// Pipeline configuration, with an optional thread-count override.
	pub fn remesh_config(&self, threads: Option<i64>) -> RemeshConfig {
		let parallelism = threads
			.or(self.threads)
			.map(Parallelism::from)
			.unwrap_or_default();
		RemeshConfig::default()
			.with_parallelism(parallelism)
			.with_solver(self.solver.clone())
	}
}
