use anyhow::Result;
use sift_core::schema::Database;
use sift_pipeline::Config;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::search::{check_catalog, explain, open_context, print_hits, resolve};

/// What the interactive loop should do with one input line.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Empty,
    Query(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "exit" | "quit" | "q" => Input::Quit,
        _ => Input::Query(line),
    }
}

/// Read queries from stdin until EOF or an exit command.
///
/// Errors from a single query are printed and the loop continues.
pub async fn run_query(k: usize, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)?;
    let context = open_context(config, &db)?;

    println!(
        "Searching {} rows (k = {k}). Type 'exit', 'quit', or 'q' to leave.",
        context.engine().len()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("sift> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match classify(&line) {
            Input::Quit => break,
            Input::Empty => println!("Type a description of what you are looking for."),
            Input::Query(query) => {
                // The catalog can be re-imported while the session is open.
                let result = match context.search(query, k).await {
                    Ok(hits) => check_catalog(&context, &db).and_then(|()| resolve(&db, &hits)),
                    Err(e) => Err(explain(e)),
                };
                match result {
                    Ok(hits) => print_hits(query, &hits),
                    Err(e) => eprintln!("Error: {e:#}"),
                }
            }
        }
    }

    Ok(())
}
