use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use docshelf_core::config::Settings;
use docshelf_core::Error;
use docshelf_embed::embedder_from_settings;
use docshelf_ingest::DocumentLoader;
use docshelf_rag::{OllamaGenerator, RagEngine};
use docshelf_vector::LanceVectorIndex;

fn build_engine(settings: &Settings) -> anyhow::Result<RagEngine> {
    let embedder = embedder_from_settings(settings)?;
    let index = LanceVectorIndex::from_settings(settings, embedder);
    let generator = OllamaGenerator::new(&settings.generation)?;
    let engine = RagEngine::new(
        settings,
        Box::new(DocumentLoader::new()),
        Box::new(index),
        Box::new(generator),
    )?;
    Ok(engine)
}

fn print_banner() {
    println!("=====================================");
    println!("  docshelf - ask your documents");
    println!("=====================================");
}

fn print_menu() {
    println!();
    println!("  1. Index documents");
    println!("  2. Load existing index");
    println!("  3. Ask a question");
    println!("  4. Delete index");
    println!("  5. Show index stats");
    println!("  6. Quit");
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run_index(engine: &mut RagEngine, settings: &Settings) -> io::Result<()> {
    let default_dir = settings.corpus_dir();
    let input = prompt_line(&format!(
        "Path to index [{}]: ",
        default_dir.display()
    ))?;
    let path = if input.is_empty() { default_dir } else { PathBuf::from(input) };

    match engine.index_documents(&path).await {
        Ok(true) => println!("[ok] documents indexed"),
        Ok(false) => println!("[!] nothing to index under {}", path.display()),
        Err(e) => println!("[error] {}", e.detail()),
    }
    Ok(())
}

async fn run_query_loop(engine: &RagEngine) -> io::Result<()> {
    println!("Type 'exit' to return to the menu.");
    loop {
        let question = prompt_line("\n[?] Your question: ")?;
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            return Ok(());
        }
        match engine.query(&question, None).await {
            Ok(result) => {
                println!("\n[answer]\n{}", result.answer);
                let sources = result.format_sources();
                if !sources.is_empty() {
                    println!("{sources}");
                }
            }
            Err(e @ Error::NotReady) => {
                println!("[!] {e}");
                return Ok(());
            }
            Err(e) => println!("[error] {}", e.detail()),
        }
    }
}

async fn run_menu(engine: &mut RagEngine, settings: &Settings) -> io::Result<()> {
    print_banner();
    loop {
        print_menu();
        let choice = prompt_line("Select an option (1-6): ")?;
        match choice.as_str() {
            "1" => run_index(engine, settings).await?,
            "2" => match engine.load_existing_index().await {
                Ok(true) => println!("[ok] index loaded"),
                Ok(false) => println!("[!] no index found; index documents first (option 1)"),
                Err(e) => println!("[error] {}", e.detail()),
            },
            "3" => {
                if engine.is_ready() {
                    run_query_loop(engine).await?;
                } else {
                    println!("[!] index documents or load an existing index first (options 1 or 2)");
                }
            }
            "4" => {
                let confirm = prompt_line("Delete the index? (y/n): ")?;
                if confirm.eq_ignore_ascii_case("y") {
                    match engine.delete_index().await {
                        Ok(()) => println!("[ok] index deleted"),
                        Err(e) => println!("[error] {}", e.detail()),
                    }
                } else {
                    println!("cancelled");
                }
            }
            "5" => match engine.stats().await {
                Ok(stats) => println!("{}", stats.format_stats()),
                Err(e) => println!("[error] {}", e.detail()),
            },
            "6" | "q" | "quit" | "exit" => {
                println!("Goodbye!");
                return Ok(());
            }
            _ => println!("[error] invalid option, choose 1-6"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("[error] {e}");
            eprintln!("Check docshelf.toml and APP_* environment variables.");
            std::process::exit(1);
        }
    };

    let mut args: Vec<String> = env::args().skip(1).collect();
    let command = if args.is_empty() { None } else { Some(args.remove(0)) };

    match command.as_deref() {
        None => {
            let mut engine = build_engine(&settings)?;
            run_menu(&mut engine, &settings).await?;
        }
        Some("ingest") => {
            let path = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| settings.corpus_dir());
            let mut engine = build_engine(&settings)?;
            match engine.index_documents(&path).await {
                Ok(true) => println!("[ok] documents indexed from {}", path.display()),
                Ok(false) => {
                    println!("[!] nothing to index under {}", path.display());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("[error] {}", e.detail());
                    std::process::exit(1);
                }
            }
        }
        Some("query") => {
            let Some(question) = args.first() else {
                eprintln!("Usage: docshelf query \"<question>\"");
                std::process::exit(1);
            };
            let mut engine = build_engine(&settings)?;
            if !engine.load_existing_index().await? {
                eprintln!("[!] no index found; run `docshelf ingest` first");
                std::process::exit(1);
            }
            match engine.query(question, None).await {
                Ok(result) => {
                    println!("{}", result.answer);
                    let sources = result.format_sources();
                    if !sources.is_empty() {
                        println!("{sources}");
                    }
                }
                Err(e) => {
                    eprintln!("[error] {}", e.detail());
                    std::process::exit(1);
                }
            }
        }
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Usage: docshelf [ingest [path] | query \"<question>\"]");
            std::process::exit(1);
        }
    }
    Ok(())
}
