//! Field-aligned remesher.
//!
//! Reads an OBJ or MEDIT mesh, runs the remeshing pipeline and writes a
//! quad-dominant OBJ mesh.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use field_remesh::{
	MeshSink, MeshSource, MultiResolutionMesh, RemeshRequest, Remesher, ScaleRequest,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use config::Config;

/// Field-aligned remesher.
#[derive(Parser, Debug)]
#[command(name = "remesh")]
#[command(about = "Remeshes a triangle or tetrahedral mesh into a field-aligned quad-dominant mesh")]
struct Args {
	/// Input mesh (.obj or .mesh).
	#[arg(short, long)]
	input: Option<PathBuf>,

	/// Output OBJ file (default: <input-stem>_remeshed.obj next to the input).
	#[arg(short, long)]
	output: Option<PathBuf>,

	/// Target edge length; omit or pass a non-positive value to estimate it.
	#[arg(short, long, allow_negative_numbers = true)]
	scale: Option<f64>,

	/// Reverse the output winding convention.
	#[arg(long)]
	flip: bool,

	/// Worker threads (-1 or 0 for all cores).
	#[arg(short, long, allow_negative_numbers = true)]
	threads: Option<i64>,

	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log at debug level.
	#[arg(short, long)]
	verbose: bool,
}

fn main() -> Result<()> {
	let args = Args::parse();

	let level = if args.verbose { Level::DEBUG } else { Level::INFO };
	tracing_subscriber::fmt().with_max_level(level).init();

	let file = match &args.config {
		Some(path) => {
			info!(path = %path.display(), "loading config");
			Config::load(path)?
		}
		None => Config::default(),
	};

	let input = args
		.input
		.or_else(|| file.input.clone())
		.context("No input mesh: pass --input or set `input` in the config file")?;
	let output = args
		.output
		.or_else(|| file.output.clone())
		.unwrap_or_else(|| default_output(&input));
	let scale = ScaleRequest::from(args.scale.or(file.scale));
	let flip = args.flip || file.flip;

	let remesher =
		Remesher::new(file.remesh_config(args.threads)).context("Failed to set up the remesher")?;
	let mesh = MultiResolutionMesh::with_settings(remesher.config().solver.clone());
	let request = RemeshRequest::new(MeshSource::File(input.clone()), MeshSink::File(output.clone()))
		.with_scale(scale)
		.with_flip(flip);

	info!(input = %input.display(), output = %output.display(), ?scale, flip, "remeshing");
	let report = remesher
		.process(mesh, request)
		.with_context(|| format!("Failed to remesh {}", input.display()))?;

	for record in report.timings() {
		info!(
			stage = record.name,
			ms = record.elapsed.as_secs_f64() * 1e3,
			"timing"
		);
	}
	let stats = report.stats();
	info!(
		scale = report.scale,
		extraction = ?report.extraction,
		faces = stats.output_faces,
		vertices = stats.output_vertices,
		orientation_singularities = stats.orientation_singularities,
		position_singularities = stats.position_singularities,
		"wrote {}",
		output.display()
	);

	Ok(())
}

/// `<stem>_remeshed.obj` next to `input`.
fn default_output(input: &Path) -> PathBuf {
	let stem = input
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.unwrap_or_else(|| "mesh".to_string());
	input.with_file_name(format!("{stem}_remeshed.obj"))
}
