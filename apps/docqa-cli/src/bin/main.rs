use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use docqa_core::config::Config;
use docqa_core::ingest::Chunker;
use docqa_embed::embedder_from_config;
use docqa_index::SharedIndex;
use docqa_pipeline::{indexing, Pipeline};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <index|ask> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "index" => {
            let mut data_dir = None;
            let mut limit = None;
            let mut i = 0;
            while i < args.len() {
                match args[i].as_str() {
                    "--limit" => {
                        let n = args
                            .get(i + 1)
                            .and_then(|s| s.parse::<usize>().ok())
                            .unwrap_or_else(|| {
                                eprintln!("Error: --limit requires a number");
                                std::process::exit(1);
                            });
                        limit = Some(n);
                        i += 1;
                    }
                    a if !a.starts_with('-') => data_dir = Some(PathBuf::from(a)),
                    _ => {}
                }
                i += 1;
            }
            let data_dir = data_dir.unwrap_or_else(|| {
                let dir: String = config.get("data.docs_dir").unwrap_or_else(|_| "data".to_string());
                PathBuf::from(dir)
            });
            let out_path = index_path(&config);
            println!("Indexing from {}", data_dir.display());

            let chunker = Chunker::new(config.chunking());
            let embedder = embedder_from_config(&config.embedding())?;
            let count = if let Some(limit) = limit {
                let chunks = docqa_core::ingest::process_directory_limited(&data_dir, &chunker, limit)?;
                let index = indexing::build_index(&chunks, embedder.as_ref())?;
                index.save(&out_path)?;
                index.len()
            } else {
                indexing::build_and_save(&data_dir, &out_path, &chunker, embedder.as_ref())?
            };
            println!("Indexed {} chunks into {}", count, out_path.display());
        }
        "ask" => {
            let question = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: docqa ask \"<question>\"");
                std::process::exit(1)
            });
            let out_path = index_path(&config);
            let index = SharedIndex::load_from(&out_path)?;
            let embedder = embedder_from_config(&config.embedding())?;

            let mut generation = config.generation();
            if generation.api_key.is_none() {
                // same lookup order as the usual OpenAI-compatible tooling
                generation.api_key = env::var("GROQ_API_KEY")
                    .or_else(|_| env::var("OPENAI_API_KEY"))
                    .ok()
                    .filter(|k| !k.trim().is_empty());
            }

            let pipeline = Pipeline::new(embedder, index, &config.retrieval(), &generation)?;
            let answer = pipeline.answer(&question)?;
            println!("[{:?}]", answer.decision);
            println!("{}", answer.text);
            if !answer.sources.is_empty() {
                println!("\nSources: {}", answer.sources.join(", "));
            }
        }
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn index_path(config: &Config) -> PathBuf {
    let path: String = config
        .get("data.index_path")
        .unwrap_or_else(|_| "index/store.json".to_string());
    docqa_core::config::expand_path(path)
}
