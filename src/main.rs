use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ninjadeps::{Record, create_empty, for_each_record, logging, read_file};

#[derive(Parser, Debug)]
#[command(name = "ninjadeps")]
#[command(version, about = "Inspect and initialize Ninja .ninja_deps dependency databases")]
struct Cli {
    /// Increase logging verbosity (use together with RUST_LOG for fine control).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current dependencies of every target (like `ninja -t deps`)
    Dump {
        /// The deps log to read
        #[arg(default_value = ".ninja_deps")]
        file: PathBuf,
    },

    /// Print every record in file order, without folding
    Records {
        /// The deps log to read
        #[arg(default_value = ".ninja_deps")]
        file: PathBuf,
    },

    /// Write a new, empty deps log (header only)
    Create {
        /// The file to create
        #[arg(default_value = ".ninja_deps")]
        file: PathBuf,

        /// Schema version to write (3 or 4)
        #[arg(long, default_value_t = 4)]
        format_version: u32,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.cmd {
        Command::Dump { file } => {
            let snapshot = read_file(&file)?;
            for target in snapshot.targets()? {
                // Every name from targets() has an entry, lookup cannot
                // come back empty here.
                let Some(entry) = snapshot.lookup(target)? else {
                    continue;
                };
                match entry.mtime {
                    Some(t) => println!("{}: #deps {} mtime {}", target, entry.deps.len(), t),
                    None => println!("{}: #deps {} (missing)", target, entry.deps.len()),
                }
                for dep in &entry.deps {
                    println!("    {}", dep);
                }
                println!();
            }
            Ok(())
        }

        Command::Records { file } => {
            let mut path_id = 0u32;
            for_each_record(&file, |record| {
                match record {
                    Record::Version(v) => println!("version {}", v),
                    Record::Path { path, .. } => {
                        println!("path {} = {}", path_id, path);
                        path_id += 1;
                    }
                    Record::Deps {
                        target,
                        mtime,
                        deps,
                    } => {
                        let mtime = match mtime {
                            Some(t) => t.to_string(),
                            None => "-".to_string(),
                        };
                        let ids: Vec<String> = deps.iter().map(|d| d.to_string()).collect();
                        println!("deps target={} mtime={} [{}]", target, mtime, ids.join(", "));
                    }
                }
                Ok(())
            })
        }

        Command::Create {
            file,
            format_version,
        } => {
            create_empty(&file, format_version)?;
            println!("created {} (version {})", file.display(), format_version);
            Ok(())
        }
    }
}
