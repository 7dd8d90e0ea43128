use anyhow::Result;
use clap::{Parser, Subcommand};
use confnode::logging::init_logging;
use confnode::{Document, Element, Key, Node};

#[derive(Parser)]
#[command(name = "confnode")]
struct Cli {
    /// Log level when CONFNODE_LOG is unset
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Init {
        file: String,
    },
    Show {
        file: String,
    },
    Get {
        file: String,
        path: String,
        #[arg(long)]
        default: Option<String>,
    },
    Set {
        file: String,
        path: String,
        value: String,
    },
    /// Attach a comment to a node; kept by formats that support comments
    Comment {
        file: String,
        path: String,
        text: String,
    },
    Hash {
        file: String,
    },
    List {
        dir: String,
        #[arg(long, default_value = ".json")]
        ext: String,
    },
}

fn segments(path: &str) -> Vec<Key> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .map(Key::from)
        .collect()
}

fn parse_value(raw: &str) -> Element {
    if let Ok(v) = raw.parse::<bool>() {
        return Element::from(v);
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Element::from(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        return Element::from(v);
    }
    Element::from(raw)
}

fn render(node: &Node) -> Result<String> {
    Ok(if node.is_scalar() {
        node.to_string()
    } else {
        serde_json::to_string_pretty(&node.to_json())?
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    match cli.command {
        Commands::Init { file } => {
            let doc = Document::must(&file);
            if doc.loader().exists() {
                println!("File already exists: {}", doc.path().display());
                return Ok(());
            }

            doc.try_save()?;
            println!("Initialized empty document at {}", doc.path().display());
        }
        Commands::Show { file } => {
            let doc = Document::must(&file);
            println!("{}", render(doc.root())?);
        }
        Commands::Get {
            file,
            path,
            default,
        } => {
            let doc = Document::must(&file);
            let node = doc.at(segments(&path));
            if node.is_virtual() || node.is_empty() {
                match default {
                    Some(default) => println!("{}", default),
                    None => println!("{} not found in {}", path, doc.path().display()),
                }
            } else {
                let comment = node.comment();
                if !comment.is_empty() {
                    println!("# {}", comment);
                }
                println!("{}", render(&node)?);
            }
        }
        Commands::Set { file, path, value } => {
            let doc = Document::must(&file);
            doc.at(segments(&path)).set(parse_value(&value));
            doc.try_save()?;
            println!("Set {} = {} in {}", path, value, doc.path().display());
        }
        Commands::Comment { file, path, text } => {
            let doc = Document::must(&file);
            doc.at(segments(&path)).set_comment(text);
            doc.try_save()?;
            println!("Commented {} in {}", path, doc.path().display());
        }
        Commands::Hash { file } => {
            let doc = Document::must(&file);
            println!("{}", hex::encode(doc.fingerprint()));
        }
        Commands::List { dir, ext } => {
            for doc in Document::all(&dir, &ext) {
                println!("{}  {}", hex::encode(doc.fingerprint()), doc.path().display());
            }
        }
    }

    Ok(())
}
