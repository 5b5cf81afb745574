//! Interactive shell - one store for the whole session
//!
//! The local backend keeps records only in memory, so this is how to use it
//! for more than a single command.

use anyhow::Result;
use kbase::store::SearchOptions;
use kbase::VectorStore;
use std::io::{self, BufRead, Write};
use std::path::Path;

use super::knowledge::{ingest_file, print_entry, print_results};
use super::open_store;

const HELP: &str = "\
Commands:
  add <text>            store text
  ingest <file>         store a UTF-8 file as one entry
  search <query>        search with the configured defaults
  topk <n>              set results per search
  threshold <t>         set minimum score
  list                  list entries
  get <id>              show one entry
  delete <id>           delete an entry
  stats                 store statistics
  help                  this text
  quit                  leave the shell";

/// What the loop should do after a line
#[derive(Debug, PartialEq)]
enum Flow {
    Continue,
    Quit,
}

pub fn execute(config: Option<&Path>) -> Result<()> {
    let store = open_store(config)?;
    let stats = store.stats()?;
    println!(
        "kbase shell ({} backend, model {}). Type 'help' for commands.",
        stats.backend, stats.model
    );

    let mut options = store.defaults();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("kbase> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line?;

        match run_line(&store, &mut options, &line) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    store.close();
    Ok(())
}

fn run_line(store: &VectorStore, options: &mut SearchOptions, line: &str) -> Result<Flow> {
    let line = line.trim();
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => println!("{}", HELP),
        "add" => {
            let id = store.add_knowledge(rest, None)?;
            println!("✓ Added {}", id);
        }
        "ingest" => {
            let id = ingest_file(store, Path::new(rest))?;
            println!("✓ {} → {}", rest, id);
        }
        "search" => {
            let results = store.search_with(rest, *options)?;
            print_results(&results, *options);
        }
        "topk" => {
            options.top_k = rest
                .parse()
                .map_err(|_| anyhow::anyhow!("topk expects a whole number, got '{}'", rest))?;
            println!("top_k = {}", options.top_k);
        }
        "threshold" => {
            options.threshold = rest
                .parse()
                .map_err(|_| anyhow::anyhow!("threshold expects a number, got '{}'", rest))?;
            println!("threshold = {}", options.threshold);
        }
        "list" => {
            let entries = store.list_knowledge()?;
            if entries.is_empty() {
                println!("(empty)");
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
        "get" => {
            let entry = store.get(rest)?;
            print_entry(&entry);
            println!("{}", entry.text);
        }
        "delete" => {
            if store.delete_knowledge(rest)? {
                println!("✓ Deleted {}", rest);
            } else {
                println!("No entry with id {}", rest);
            }
        }
        "stats" => {
            let stats = store.stats()?;
            println!(
                "{} entries, dimension {}, backend {}, model {}",
                stats.count, stats.dimension, stats.backend, stats.model
            );
        }
        other => anyhow::bail!("Unknown command '{}'. Type 'help'.", other),
    }
    Ok(Flow::Continue)
}
