//! livesearch: debounced live search over an in-memory people directory
//!
//! Two modes:
//! - `search` runs the matcher once and prints the result (no pipeline).
//! - `watch` (default): runs the reactive pipeline — stdin lines become
//!   query updates, results and the busy indicator are printed as they are
//!   emitted.

mod cli;
mod error;
mod person;
mod pipeline;
mod viewmodel;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, SearchArgs, WatchArgs};
use person::Person;
use pipeline::SearchPipeline;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::info;
use viewmodel::SearchViewModel;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // Log to stderr to keep stdout clean
        .init();

    let people = match &args.people {
        Some(path) => person::load_people(path)?,
        None => person::sample_people(),
    };

    match args.command {
        Some(Commands::Search(search)) => run_search(search, &people),
        Some(Commands::Watch(watch)) => run_watch(watch, people).await,
        None => run_watch(WatchArgs::default(), people).await,
    }
}

/// One-shot mode: apply the matcher directly, no debounce and no latency
fn run_search(args: SearchArgs, people: &[Person]) -> Result<()> {
    let matches: Vec<&Person> = people
        .iter()
        .filter(|person| person.matches_query(&args.query))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        for person in &matches {
            println!("{}", person.display_name());
        }
        info!(query = %args.query, matches = matches.len(), "search finished");
    }

    Ok(())
}

/// Interactive mode: stdin lines drive the pipeline's query slot
async fn run_watch(args: WatchArgs, people: Vec<Person>) -> Result<()> {
    let pipeline = SearchPipeline::new(people, args.pipeline_config());
    let vm = SearchViewModel::attach(&pipeline);

    println!("type to search ({} people); Ctrl-D quits", vm.latest_results().len());
    for line in vm.display_lines() {
        println!("  {line}");
    }

    let renderer = tokio::spawn(render_loop(vm));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        pipeline.set_query(line);
    }

    renderer.abort();
    info!("stdin closed, exiting watch mode");
    Ok(())
}

/// Print busy transitions and result snapshots as the pipeline emits them
async fn render_loop(mut vm: SearchViewModel) {
    let mut results = vm.results_stream();
    loop {
        tokio::select! {
            _ = vm.busy_changed() => {
                if vm.is_busy() {
                    println!("searching...");
                }
            }
            Some(snapshot) = results.next() => {
                println!("{} match(es):", snapshot.len());
                for person in snapshot.iter() {
                    println!("  {}", person.display_name());
                }
            }
        }
    }
}
