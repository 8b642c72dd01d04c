use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use fleet_store::api::{self, Vm};
use fleet_store::client::{self, Client};
use fleet_store::engine::Serializer;
use fleet_store::filter::{AllFilter, IdNameFilter};
use fleet_store::meta::{Kind, Object, Uid};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory; falls back to $FLEET_DATA_DIR, then /var/lib/fleet.
    #[arg(short, long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// List objects of a kind.
    Ls { kind: String },
    /// Print the object matching an ID/name prefix.
    Get { kind: String, query: String },
    /// Count objects of a kind.
    Count { kind: String },
    /// Delete the objects matching each ID/name prefix.
    Rm {
        kind: String,
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Store an object from a JSON or YAML file.
    Apply { file: PathBuf },
    /// Create a new VM.
    CreateVm {
        #[arg(long)]
        name: String,
        #[arg(long)]
        image: String,
        #[arg(long)]
        kernel: String,
        #[arg(long, default_value_t = 1)]
        cpus: u64,
        #[arg(long, default_value_t = 512)]
        memory: u64,
    },
}

fn parse_kind(input: &str) -> anyhow::Result<Kind> {
    api::parse_kind(&api::scheme(), input).ok_or_else(|| anyhow!("unknown kind {:?}", input))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let data_dir = client::resolve_data_dir(cli.data_dir);
    let client = client::open(&data_dir)
        .with_context(|| format!("failed to open store at {}", data_dir))?;

    match cli.command {
        Commands::Ls { kind } => {
            let kind = parse_kind(&kind)?;
            let objects = client.storage().find_all(&kind, &mut AllFilter::new())?;
            println!("{:<18} {:<24} CREATED", "UID", "NAME");
            for obj in &objects {
                let obj: &dyn Object = &**obj;
                let created = obj
                    .created()
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<18} {:<24} {}", obj.uid(), obj.name(), created);
            }
        }
        Commands::Get { kind, query } => {
            let kind = parse_kind(&kind)?;
            let found = client.storage().find(&kind, &mut IdNameFilter::new(query))?;
            let obj = client.storage().get_by_id(&kind, found.uid())?;
            println!("{}", serde_json::to_string_pretty(&obj.to_value()?)?);
        }
        Commands::Count { kind } => {
            let kind = parse_kind(&kind)?;
            println!("{}", client.storage().count(&kind)?);
        }
        Commands::Rm { kind, queries } => {
            let kind = parse_kind(&kind)?;
            remove(&client, &kind, &queries)?;
        }
        Commands::Apply { file } => {
            let content =
                fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
            let serializer = Serializer::new(api::scheme());
            let mut obj = serializer.decode(&content)?;
            if obj.uid().is_empty() {
                obj.object_meta_mut().uid = Uid::random();
            }
            client.storage().set(&mut *obj)?;
            println!("{}", obj.uid());
        }
        Commands::CreateVm { name, image, kernel, cpus, memory } => {
            // Resolve references up front so a typo fails before anything is written.
            let image = client.images().find(&mut IdNameFilter::new(image))?;
            let kernel = client.kernels().find(&mut IdNameFilter::new(kernel))?;

            let mut vm = Vm::new(name);
            vm.spec.image = image.metadata.uid.to_string();
            vm.spec.kernel = kernel.metadata.uid.to_string();
            vm.spec.cpus = cpus;
            vm.spec.memory_mib = memory;
            client.vms().set(&mut vm)?;
            println!("{}", vm.metadata.uid);
        }
    }

    Ok(())
}

fn remove(client: &Client, kind: &Kind, queries: &[String]) -> anyhow::Result<()> {
    // Resolve every query before deleting anything.
    let mut uids = Vec::with_capacity(queries.len());
    for query in queries {
        let found = client.storage().find(kind, &mut IdNameFilter::new(query.as_str()))?;
        uids.push(found.uid().clone());
    }
    for uid in uids {
        client.storage().delete(kind, &uid)?;
        println!("{}", uid);
    }
    Ok(())
}
