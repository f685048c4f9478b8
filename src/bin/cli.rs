//! dsp CLI - command line interface over the graph engine.

use anyhow::bail;
use clap::Parser;
use dsp::cli::{render, Cli, Commands};
use dsp::record::Description;
use dsp::{Engine, Store};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// DSP_LOG takes precedence; --verbose turns on debug for the crate.
fn init_tracing(verbose: bool) {
    let default = if verbose { "dsp=debug" } else { "dsp=warn" };
    let filter =
        EnvFilter::try_from_env("DSP_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let engine = Engine::new(Store::new(&cli.root));
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            let base = engine.init()?;
            if json {
                emit(&serde_json::json!({ "base": base }))?;
            } else {
                println!("initialized {}", base.display());
            }
        }

        Commands::CreateObject {
            source,
            purpose,
            kind,
            toc,
        } => {
            let uid = engine.create_object(&source, &purpose, &kind, toc.as_deref())?;
            created(json, &uid)?;
        }

        Commands::CreateFunction {
            source,
            purpose,
            owner,
            toc,
        } => {
            let uid =
                engine.create_function(&source, &purpose, owner.as_deref(), toc.as_deref())?;
            created(json, &uid)?;
        }

        Commands::CreateShared { exporter, shared } => {
            engine.create_shared(&exporter, &shared)?;
            ok(json)?;
        }

        Commands::AddImport {
            importer,
            imported,
            why,
            exporter,
        } => {
            engine.add_import(&importer, &imported, &why, exporter.as_deref())?;
            ok(json)?;
        }

        Commands::RemoveImport {
            importer,
            imported,
            exporter,
        } => {
            engine.remove_import(&importer, &imported, exporter.as_deref())?;
            ok(json)?;
        }

        Commands::RemoveShared { exporter, shared } => {
            engine.remove_shared(&exporter, &shared)?;
            ok(json)?;
        }

        Commands::UpdateDescription {
            uid,
            source,
            purpose,
            kind,
        } => {
            let mut fields = Description::new();
            if let Some(source) = &source {
                fields.set("source", source);
            }
            if let Some(kind) = &kind {
                fields.set("kind", kind);
            }
            if let Some(purpose) = &purpose {
                fields.set("purpose", purpose);
            }
            if fields.is_empty() {
                bail!("provide at least one field to update (--source, --purpose, --kind)");
            }
            engine.update_description(&uid, &fields)?;
            ok(json)?;
        }

        Commands::UpdateImportWhy {
            importer,
            imported,
            why,
            exporter,
        } => {
            engine.update_import_why(&importer, &imported, &why, exporter.as_deref())?;
            ok(json)?;
        }

        Commands::MoveEntity { uid, new_source } => {
            engine.move_entity(&uid, &new_source)?;
            ok(json)?;
        }

        Commands::RemoveEntity { uid } => {
            engine.remove_entity(&uid)?;
            ok(json)?;
        }

        Commands::GetEntity { uid } => {
            let info = engine.get_entity(&uid)?;
            if json {
                emit(&info)?;
            } else {
                print!("{}", render::entity(&info));
            }
        }

        Commands::GetShared { uid } => {
            let items = engine.get_shared(&uid)?;
            if json {
                emit(&items)?;
            } else {
                print!("{}", render::shared_entries(&items));
            }
        }

        Commands::GetRecipients { uid } => {
            let recs = engine.get_recipients(&uid)?;
            if json {
                emit(&recs)?;
            } else {
                print!("{}", render::recipients(&recs));
            }
        }

        Commands::GetChildren { uid, depth } => {
            let tree = engine.get_children(&uid, depth)?;
            if json {
                emit(&tree)?;
            } else {
                print!("{}", render::tree(&tree));
            }
        }

        Commands::GetParents { uid, depth } => {
            let tree = engine.get_parents(&uid, depth)?;
            if json {
                emit(&tree)?;
            } else {
                print!("{}", render::tree(&tree));
            }
        }

        Commands::GetPath { from, to } => match engine.get_path(&from, &to)? {
            Some(path) => {
                if json {
                    emit(&path)?;
                } else {
                    print!("{}", render::path(&path));
                }
            }
            None => {
                if json {
                    println!("null");
                } else {
                    println!("no path found");
                }
                std::process::exit(1);
            }
        },

        Commands::Search { query } => {
            let hits = engine.search(&query)?;
            if json {
                emit(&hits)?;
            } else {
                print!("{}", render::search_hits(&hits));
            }
        }

        Commands::FindBySource { source_path } => {
            let found = engine.find_by_source(&source_path)?;
            if found.is_empty() {
                if json {
                    println!("[]");
                } else {
                    println!("not found");
                }
                std::process::exit(1);
            }
            if json {
                emit(&found)?;
            } else {
                for uid in &found {
                    println!("{uid}");
                }
            }
        }

        Commands::ReadToc { toc } => {
            let uids = engine.read_toc(toc.as_deref())?;
            if json {
                emit(&uids)?;
            } else {
                print!("{}", render::toc(&uids));
            }
        }

        Commands::DetectCycles => {
            let cycles = engine.detect_cycles()?;
            if json {
                emit(&cycles)?;
            } else {
                print!("{}", render::cycles(&cycles));
            }
        }

        Commands::GetOrphans => {
            let orphans = engine.get_orphans()?;
            if json {
                emit(&orphans)?;
            } else {
                print!("{}", render::orphans(&orphans));
            }
        }

        Commands::GetStats => {
            let stats = engine.get_stats()?;
            if json {
                emit(&stats)?;
            } else {
                print!("{}", render::stats(&stats));
            }
        }
    }

    Ok(())
}

fn emit<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn created(json: bool, uid: &str) -> anyhow::Result<()> {
    if json {
        emit(&serde_json::json!({ "uid": uid }))
    } else {
        println!("{uid}");
        Ok(())
    }
}

fn ok(json: bool) -> anyhow::Result<()> {
    if json {
        emit(&serde_json::json!({ "status": "ok" }))
    } else {
        println!("ok");
        Ok(())
    }
}
