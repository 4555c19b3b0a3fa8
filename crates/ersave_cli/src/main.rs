use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use ersave_core::SaveType;
use ersave_core::core_api::{CoreError, Engine, FaceSummary, Session, SlotSummary};
use ersave_core::slot::SlotKind;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(value_name = "SAVE")]
    path: PathBuf,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG
    /// takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List slots with character names and levels.
    List {
        #[arg(long)]
        slot: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// List the face pool stored in the summary slot.
    Faces {
        #[arg(long)]
        json: bool,
    },
    /// Export a character slot (payload plus summary entry) to a file.
    Export {
        #[arg(long)]
        slot: usize,
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },
    /// Import a character exported with `export`.
    Import {
        /// Target slot; defaults to the first empty character slot.
        #[arg(long)]
        slot: Option<usize>,
        /// Keep the face currently stored in the target slot.
        #[arg(long = "keep-face")]
        keep_face: bool,
        #[arg(value_name = "IN")]
        input: PathBuf,
    },
    /// Export the face of a character slot.
    ExportFace {
        #[arg(long)]
        slot: usize,
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },
    /// Import a face into a character slot, or face pool records into the
    /// pool when no slot is given.
    ImportFace {
        #[arg(long)]
        slot: Option<usize>,
        /// First pool index to write when importing pool records.
        #[arg(long, conflicts_with = "slot")]
        start: Option<usize>,
        #[arg(value_name = "IN")]
        input: PathBuf,
    },
    /// Export face pool records; all available ones unless indices are given.
    ExportFaces {
        #[arg(long = "index", value_delimiter = ',')]
        indices: Vec<usize>,
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },
    /// Rewrite the user id of one character slot, or of all of them.
    Resign {
        #[arg(long)]
        slot: Option<usize>,
        /// Defaults to the user id stored in the summary slot.
        #[arg(long = "user-id")]
        user_id: Option<u64>,
    },
    /// Rewrite stored checksums that no longer match their slot.
    FixChecksums,
    /// Report whether every stored checksum matches its slot.
    Verify,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut session = Engine::new().open_path(&cli.path).unwrap_or_else(|e| {
        eprintln!("Error opening save file: {}", cli.path.display());
        eprintln!("  {}", e);
        process::exit(1);
    });
    info!(
        path = %cli.path.display(),
        save_type = %session.save_type(),
        slots = session.container().len(),
        "opened save"
    );

    // Operation failures are reported, not turned into an exit status.
    if let Err(e) = run(&mut session, cli.command) {
        eprintln!("Error: {e}");
    }
}

fn run(session: &mut Session, command: Command) -> Result<(), CoreError> {
    match command {
        Command::List { slot, json } => {
            let slots = session.list_slots(slot)?;
            if json {
                print_json(&json!({
                    "save_type": session.save_type(),
                    "user_id": session.summary().user_id,
                    "slots": slots,
                }));
            } else {
                print_slots(session, &slots);
            }
        }
        Command::Faces { json } => {
            let faces = session.list_faces()?;
            if json {
                print_json(&json!({ "faces": faces }));
            } else {
                print_faces(&faces);
            }
        }
        Command::Export { slot, output } => {
            session.export_character(slot, &output)?;
            println!("Exported slot {slot} to {}", output.display());
        }
        Command::Import {
            slot,
            keep_face,
            input,
        } => {
            let slot = session.import_character(slot, &input, keep_face)?;
            println!("Imported {} into slot {slot}", input.display());
        }
        Command::ExportFace { slot, output } => {
            session.export_face(slot, &output)?;
            println!("Exported face of slot {slot} to {}", output.display());
        }
        Command::ImportFace {
            slot: Some(slot),
            input,
            ..
        } => {
            session.import_face(slot, &input)?;
            println!("Imported face into slot {slot}");
        }
        Command::ImportFace {
            slot: None,
            start,
            input,
        } => {
            let count = session.import_faces(&input, start)?;
            println!("Imported {count} face(s) into the face pool");
        }
        Command::ExportFaces { indices, output } => {
            let count = session.export_faces(&indices, &output)?;
            println!("Exported {count} face(s) to {}", output.display());
        }
        Command::Resign { slot, user_id } => {
            let count = session.resign(slot, user_id)?;
            println!("Re-signed {count} character slot(s)");
        }
        Command::FixChecksums => {
            let count = session.fix_checksums()?;
            println!("Fixed {count} checksum(s)");
        }
        Command::Verify => {
            if session.verify_checksums() {
                println!("checksums: ok");
            } else {
                println!("checksums: mismatch");
            }
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error serializing JSON: {e}"),
    }
}

fn print_slots(session: &Session, slots: &[SlotSummary]) {
    let summary = session.summary();
    println!("SaveType: {}", summary.save_type);
    if summary.save_type == SaveType::Steam {
        println!("User ID:  {}", summary.user_id);
    }
    for slot in slots {
        match slot.kind {
            SlotKind::Character => {
                let Some(character) = slot.character.as_ref().filter(|c| !c.is_empty()) else {
                    continue;
                };
                let marker = if character.available { "" } else { " [deleted]" };
                println!(
                    "{:4}: {} (Level {}){marker}",
                    slot.index, character.name, character.level
                );
            }
            SlotKind::Summary => println!("{:4}: Summary", slot.index),
            SlotKind::Other => println!("{:4}: Other", slot.index),
        }
    }
}

fn print_faces(faces: &[FaceSummary]) {
    for face in faces.iter().filter(|f| f.available) {
        println!("{:4}: {}", face.index, face.gender);
    }
}
