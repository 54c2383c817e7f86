use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "docclass-server")]
#[command(author, version, about = "Document classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "docclass.yaml")]
    pub config: String,

    /// Model artifact path (defaults to the bundled model)
    #[arg(short, long, env = "DOCCLASS_MODEL")]
    pub model: Option<String>,

    /// Target field to predict (defaults to the model's first target)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
