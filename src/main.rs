use std::env;
use std::fs::create_dir_all;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info};
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_items::config::DEFAULT_CONFIG_PATH;
use osm_items::errors::Result;
use osm_items::etl::parse_osm::ParseOsmEtl;
use osm_items::etl::semantic_map::SemanticMapEtl;
use osm_items::etl::Etl;
use osm_items::UserConfig;

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let output_dir = config.output_dir_for_input()?;
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn run(user_config: &UserConfig) -> Result<()> {
    let output_dir = create_output_dir(user_config)?;

    let mut parse_etl = ParseOsmEtl::new(user_config);
    let mut semantic_etl = SemanticMapEtl::new();
    if user_config.refresh {
        parse_etl.clean(&output_dir)?;
        semantic_etl.clean(&output_dir)?;
    }

    parse_etl.process(&output_dir)?;
    semantic_etl.process(&output_dir)?;

    let items = SemanticMapEtl::read_items(&output_dir)?;
    let output_dir = output_dir.display().to_string();
    info!(items = items.len(), output_dir = output_dir.as_str(); "Wrote {} items to {output_dir}", items.len());
    Ok(())
}

fn main() -> ExitCode {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let user_config = match UserConfig::load(Path::new(&config_path)) {
        Ok(user_config) => user_config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        },
    };
    setup_logging(&user_config.log_level);

    match run(&user_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(err = err.message.as_str(); "Run failed");
            ExitCode::FAILURE
        },
    }
}
