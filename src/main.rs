use clap::{Parser, Subcommand, ValueEnum};
use pokesave::image::SaveImage;
use pokesave::layout::{gold_silver, FieldKind, Layout};
use pokesave::store::{FileStore, SaveStore};
use pokesave::value::FieldValue;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Widest value shown per row by `list`.
const LIST_VALUE_WIDTH: usize = 48;

#[derive(Parser)]
#[command(name = "pokesave", about = "Pokemon Gold/Silver save editor and checksum fixer")]
struct Cli {
    /// Field layout JSON (default: built-in Gold/Silver layout)
    #[arg(long, global = true)]
    layout: Option<PathBuf>,
    /// Write the result here instead of over the input
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Copy the file being overwritten to <file>.bak first
    #[arg(long, global = true)]
    backup: bool,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every field with its decoded value
    List {
        save: PathBuf,
    },
    /// Print one field
    Get {
        save: PathBuf,
        field: String,
        /// Hex bytes instead of the decoded value
        #[arg(short, long)]
        raw: bool,
    },
    /// Set one field, fix checksums and write the save
    Set {
        save: PathBuf,
        field: String,
        /// Hex for opaque fields, text for names, numbers, H:MM:SS, badge or palette names
        value: String,
        /// Only rewrite this slot (1-based) of a text-slot field such as pc_box_names
        #[arg(long)]
        slot: Option<usize>,
    },
    /// Rename the player or the rival
    Rename {
        save: PathBuf,
        #[arg(value_enum)]
        who: Who,
        name: String,
    },
    /// Compare stored checksums with recomputed ones (exit 2 on mismatch)
    Verify {
        save: PathBuf,
    },
    /// Recompute checksums and write the save
    Fix {
        save: PathBuf,
    },
    /// Print the active layout as JSON
    Layout,
}

#[derive(Clone, Copy, ValueEnum)]
enum Who {
    Player,
    Rival,
}

impl Who {
    fn field(self) -> &'static str {
        match self {
            Who::Player => "player_name",
            Who::Rival  => "rival_name",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let layout = load_layout(cli.layout.as_deref())?;
    let store_for = |save: &Path| {
        let store = FileStore::new(save).backup(cli.backup);
        match &cli.output {
            Some(out) => store.output(out),
            None      => store,
        }
    };

    match cli.command {

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { save } => {
            let img = open(&mut store_for(&save), layout)?;
            println!("{:>3}  {:<20} {:>7} {:>5}  Value", "#", "Field", "Address", "Size");
            for (i, f) in img.layout().fields().iter().enumerate() {
                let value = img.read_value(&f.name)?.to_string();
                println!("{:>3}  {:<20} {:>7} {:>5}  {}",
                    i, f.name, format!("0x{:04x}", f.address), f.size,
                    clip(&value, LIST_VALUE_WIDTH));
            }
        }

        // ── Get ──────────────────────────────────────────────────────────────
        Commands::Get { save, field, raw } => {
            let img = open(&mut store_for(&save), layout)?;
            if raw {
                println!("{}", hex::encode(img.read_field(&field)?));
            } else {
                println!("{}", img.read_value(&field)?);
            }
        }

        // ── Set ──────────────────────────────────────────────────────────────
        Commands::Set { save, field, value, slot } => {
            let mut store = store_for(&save);
            let mut img = open(&mut store, layout)?;
            let kind = img.layout().resolve(&field)?.kind;
            if kind == FieldKind::Checksum {
                return Err(format!("{field} is a checksum; use `fix` to recompute it").into());
            }
            match slot {
                Some(0) => return Err("slots are numbered from 1".into()),
                Some(n) => img.write_slot(&field, n - 1, &value)?,
                None => img.write_value(&field, &FieldValue::parse(kind, &value)?)?,
            }
            img.validate()?;
            store.persist(&img.export()?)?;
            println!("{field} = {}", img.read_value(&field)?);
        }

        // ── Rename ───────────────────────────────────────────────────────────
        Commands::Rename { save, who, name } => {
            let mut store = store_for(&save);
            let mut img = open(&mut store, layout)?;
            img.write_name(who.field(), &name)?;
            img.validate()?;
            store.persist(&img.export()?)?;
            println!("{} = {:?}", who.field(), img.read_name(who.field())?);
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { save } => {
            let img = open(&mut store_for(&save), layout)?;
            let report = img.verify()?;
            for e in &report.entries {
                println!("{:<20} 0x{:04x}  stored {:04x}  computed {:04x}  {}",
                    e.name, e.address, e.stored, e.computed,
                    if e.is_valid() { "ok" } else { "STALE" });
            }
            println!("{}", report.summary());
            if !report.is_consistent() {
                return Ok(ExitCode::from(2));
            }
        }

        // ── Fix ──────────────────────────────────────────────────────────────
        Commands::Fix { save } => {
            let mut store = store_for(&save);
            let mut img = open(&mut store, layout)?;
            let before = img.verify()?;
            img.validate()?;
            store.persist(&img.export()?)?;
            println!("{} → fixed, written to {}", before.summary(), store.target().display());
        }

        // ── Layout ───────────────────────────────────────────────────────────
        Commands::Layout => {
            println!("{}", layout.to_json()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_layout(path: Option<&Path>) -> Result<Layout, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(p) => {
            log::info!("using layout {}", p.display());
            Layout::from_json(&std::fs::read_to_string(p)?)?
        }
        None => gold_silver::layout()?,
    })
}

fn open<S: SaveStore>(store: &mut S, layout: Layout) -> Result<SaveImage, Box<dyn std::error::Error>> {
    Ok(SaveImage::load(store.load()?, layout)?)
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    out
}
