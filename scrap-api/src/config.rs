use clap::Parser;
use dotenv::dotenv;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file (without extension), layered under SCRAP__* environment variables
    #[arg(short, long, env = "SCRAP_CONFIG", default_value = "config/default")]
    pub config: String,

    /// Overrides api.bind_addr
    #[arg(short, long)]
    pub bind_addr: Option<String>,
}

pub fn load_args() -> Args {
    dotenv().ok();
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["scrap-api", "--config", "/etc/scrap/prod", "--bind-addr", "127.0.0.1:9000"]);
        assert_eq!(args.config, "/etc/scrap/prod");
        assert_eq!(args.bind_addr.as_deref(), Some("127.0.0.1:9000"));
    }
}
