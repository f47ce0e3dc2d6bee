use quorum_bbcode::{BbCode, BbCodeError, ParserConfig};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<String> = None;
    let mut render = false;
    let mut files: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(path.clone()),
                    None => {
                        eprintln!("--config requires a file argument");
                        process::exit(1);
                    }
                }
            }
            "--render" => render = true,
            other => files.push(other.to_string()),
        }
        i += 1;
    }

    if files.is_empty() {
        eprintln!("Usage: bbcode-check [--config <config.yaml>] [--render] <file>...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  bbcode-check post.bbcode");
        eprintln!("  bbcode-check --config forum.yaml --render drafts/*.bbcode");
        process::exit(1);
    }

    let engine = match build_engine(config_path.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("✗ could not load configuration:");
            eprintln!("  {}", e);
            process::exit(1);
        }
    };

    let mut exit_code = 0;

    for file_path in files {
        let markup = match fs::read_to_string(&file_path) {
            Ok(markup) => markup,
            Err(e) => {
                eprintln!("✗ could not read {}: {}", file_path, e);
                exit_code = 1;
                continue;
            }
        };

        let result = engine.validate(&markup);
        if result.is_valid {
            println!("✓ {} is valid", file_path);
        } else {
            eprintln!("✗ {} has errors:", file_path);
            for error in &result.errors {
                eprintln!("  {}", error);
            }
            exit_code = 1;
        }

        if render {
            println!("{}", engine.render(&markup));
        }
    }

    process::exit(exit_code);
}

fn build_engine(config_path: Option<&str>) -> Result<BbCode, BbCodeError> {
    let config = match config_path {
        Some(path) => {
            let yaml = fs::read_to_string(path)
                .map_err(|e| BbCodeError::ConfigError(format!("failed to read {}: {}", path, e)))?;
            ParserConfig::from_yaml(&yaml)?
        }
        None => ParserConfig::default(),
    };
    BbCode::with_config(config)
}
