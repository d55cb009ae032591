use anyhow::{bail, Context, Result};
use butterfly_ch::validate::{validate_matrix, validate_queries};
use butterfly_ch::{
    build_graph, BidirectionalDykstra, ContractionConfig, DefaultWeightHandler, HierarchyBuilder,
    ManyToManyWeights, Vertex, WeightHandler,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

mod files;

use files::{load_config, load_graph, save_graph, NetworkFile};

#[derive(Parser)]
#[command(name = "butterfly-ch-route")]
#[command(about = "Contraction hierarchy routing over JSON road networks", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Contract a road network and write the hierarchy
    Contract {
        /// Road network (JSON)
        #[arg(long)]
        network: PathBuf,
        /// Output graph file (JSON)
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        settings: Settings,
    },
    /// Shortest route between two vertices
    Route {
        /// Contracted graph file
        #[arg(long)]
        graph: PathBuf,
        #[arg(long)]
        from: Vertex,
        #[arg(long)]
        to: Vertex,
    },
    /// Weight matrix between vertex lists
    Matrix {
        /// Contracted graph file
        #[arg(long)]
        graph: PathBuf,
        /// Comma-separated source vertices
        #[arg(long, value_delimiter = ',', required = true)]
        sources: Vec<Vertex>,
        /// Comma-separated target vertices
        #[arg(long, value_delimiter = ',', required = true)]
        targets: Vec<Vertex>,
    },
    /// Contract a network and compare random queries against Dijkstra
    Validate {
        /// Road network (JSON)
        #[arg(long)]
        network: PathBuf,
        /// Number of random point-to-point queries
        #[arg(long, default_value = "100")]
        queries: usize,
        /// Side of the random matrix check; 0 skips it
        #[arg(long, default_value = "10")]
        matrix_size: usize,
        #[arg(long, default_value = "42")]
        seed: u64,
        #[command(flatten)]
        settings: Settings,
    },
}

/// Contraction settings: an optional TOML file, then flag overrides.
#[derive(Args)]
struct Settings {
    /// Contraction settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    difference_factor: Option<f32>,
    #[arg(long)]
    depth_factor: Option<f32>,
    #[arg(long)]
    contracted_factor: Option<f32>,
    /// Maximum edges on a witness path
    #[arg(long)]
    hop_limit: Option<u32>,
    /// Maximum vertices settled per witness search
    #[arg(long)]
    max_settles: Option<usize>,
}

impl Settings {
    fn resolve(&self) -> Result<ContractionConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(v) = self.difference_factor {
            config.difference_factor = v;
        }
        if let Some(v) = self.depth_factor {
            config.depth_factor = v;
        }
        if let Some(v) = self.contracted_factor {
            config.contracted_factor = v;
        }
        if let Some(v) = self.hop_limit {
            config.hop_limit = v;
        }
        if self.max_settles.is_some() {
            config.max_settles = self.max_settles;
        }
        config.validate().context("Invalid contraction settings")?;
        Ok(config)
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn show(weight: f32) -> String {
    if weight == DefaultWeightHandler.infinite() {
        "-".to_string()
    } else {
        format!("{weight:.1}")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);
    let handler = DefaultWeightHandler;

    match cli.command {
        Commands::Contract {
            network,
            output,
            settings,
        } => {
            let config = settings.resolve()?;
            let (network, profile) = NetworkFile::load(&network)?.into_parts();

            let mut graph = build_graph(&network, &profile, handler)?;
            let stats = HierarchyBuilder::from_config(&mut graph, handler, &config)?.run()?;
            save_graph(&graph, &output)?;

            println!("Vertices:        {}", stats.vertex_count);
            println!("Original edges:  {}", stats.original_edges);
            println!("Shortcuts added: {}", stats.shortcuts_added);
            println!("Final edges:     {}", stats.final_edges);
            println!("Contraction took {:.2}s", stats.elapsed_ms as f64 / 1000.0);
            println!("Graph saved to {}", output.display());
        }
        Commands::Route { graph, from, to } => {
            let graph = load_graph(&graph)?;
            let start = Instant::now();

            let mut query = BidirectionalDykstra::from_vertices(&graph, handler, from, to)?;
            query.run()?;
            match (query.weight(), query.path()?) {
                (Some(weight), Some(path)) => {
                    let path: Vec<String> = path.iter().map(|v| v.to_string()).collect();
                    println!("Weight: {}", show(weight));
                    println!("Path: {}", path.join(" -> "));
                }
                _ => println!("No route from {from} to {to}"),
            }
            tracing::info!(elapsed_us = start.elapsed().as_micros() as u64, "route query done");
        }
        Commands::Matrix {
            graph,
            sources,
            targets,
        } => {
            let graph = load_graph(&graph)?;
            let mut m2m = ManyToManyWeights::from_vertices(&graph, handler, &sources, &targets)?;
            m2m.run()?;

            let header: Vec<String> = targets.iter().map(|t| t.to_string()).collect();
            println!("\t{}", header.join("\t"));
            for (source, row) in sources.iter().zip(m2m.weights()) {
                let cells: Vec<String> = row.iter().map(|&w| show(w)).collect();
                println!("{source}\t{}", cells.join("\t"));
            }
        }
        Commands::Validate {
            network,
            queries,
            matrix_size,
            seed,
            settings,
        } => {
            let config = settings.resolve()?;
            let (network, profile) = NetworkFile::load(&network)?.into_parts();

            let original = build_graph(&network, &profile, handler)?;
            let mut contracted = original.clone();
            HierarchyBuilder::from_config(&mut contracted, handler, &config)?.run()?;

            let mut valid = true;
            let result = validate_queries(&original, &contracted, handler, queries, seed)?;
            println!("Point-to-point queries\n{result}\n");
            valid &= result.is_valid();

            if matrix_size > 0 {
                let result = validate_matrix(&original, &contracted, handler, matrix_size, seed)?;
                println!("Matrix {matrix_size}x{matrix_size}\n{result}");
                valid &= result.is_valid();
            }
            if !valid {
                bail!("Hierarchy disagrees with Dijkstra");
            }
        }
    }

    Ok(())
}
