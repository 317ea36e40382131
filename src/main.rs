use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{anyhow, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::types::Instance;
use aws_sdk_ec2::Client;
use clap::{Args, Parser, Subcommand};
use colored::*;

mod ec2;
mod format;
mod prompt;

#[derive(Parser)]
#[command(name = "ec2")]
#[command(about = "Fuzzy-match EC2 instances by name or address, then ssh or list")]
#[command(version)]
struct Cli {
    /// AWS region to query
    #[arg(
        short = 'r',
        long = "region",
        global = true,
        default_value = "us-east-1"
    )]
    region: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open an interactive shell on the matching instance
    Ssh(SshArgs),
    /// Print the matching instances
    Ls(LsArgs),
}

#[derive(Args)]
struct SshArgs {
    /// Substring matched against instance names and addresses
    query: String,

    /// Identity file handed to ssh
    #[arg(short = 'i', long = "key", value_name = "PATH")]
    key: Option<PathBuf>,

    /// Remote login user
    #[arg(short = 'l', long = "login", value_name = "USER")]
    login: Option<String>,

    /// Connect to the public address instead of the private one
    #[arg(short = 'p', long = "prefer-public-ip")]
    prefer_public_ip: bool,

    /// Pre-selected match index, skips the prompt
    #[arg(
        short = 'n',
        long = "pick",
        value_name = "INDEX",
        value_parser = clap::value_parser!(u32).range(1..=999_999)
    )]
    pick: Option<u32>,

    /// Extra arguments forwarded to ssh
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    ssh_args: Vec<String>,
}

#[derive(Args)]
struct LsArgs {
    /// Substring matched against instance names and addresses
    query: String,

    /// Separator between rendered instances
    #[arg(short = 'd', long = "delim", default_value = "\n")]
    delim: String,

    /// Formatter key, or a format template with --custom-format
    #[arg(short = 'f', long = "formatter", default_value = "extended_private")]
    formatter: String,

    /// Treat the formatter argument as a format template
    #[arg(short = 'c', long = "custom-format")]
    custom_format: bool,
}

fn print_info(message: &str) {
    eprintln!("{} {}", "[INFO]".blue().bold(), message);
}

fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}

fn die(message: &str) -> ! {
    print_error(message);
    std::process::exit(1);
}

async fn ec2_client(region: &str) -> Client {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await;
    Client::new(&config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ec2_client(&cli.region).await;

    match cli.command {
        Commands::Ssh(args) => run_ssh(&client, args).await,
        Commands::Ls(args) => run_ls(&client, args).await,
    }
}

async fn run_ssh(client: &Client, args: SshArgs) -> Result<()> {
    let (get_address, fmt_match): (fn(&Instance) -> Option<&str>, format::Formatter) =
        if args.prefer_public_ip {
            (ec2::public_ip, format::extended_public)
        } else {
            (ec2::private_ip, format::extended_private)
        };

    let matches = ec2::match_instances(client, &args.query).await?;
    let pick = args.pick.map(|pick| pick as usize);
    let chosen = match prompt::select_instance(&matches, pick, fmt_match) {
        Ok(instance) => instance,
        Err(e) => die(&e.to_string()),
    };

    print_info(&format!("sshing {}", fmt_match(chosen)));

    let mut ssh = Command::new("ssh");
    ssh.arg("-oStrictHostKeyChecking=no");
    if let Some(key) = &args.key {
        ssh.arg("-i").arg(key);
    }
    if let Some(login) = &args.login {
        ssh.arg("-l").arg(login);
    }
    // An instance missing the preferred address is still handed to ssh, with
    // an empty host argument.
    ssh.arg(get_address(chosen).unwrap_or_default());
    ssh.args(&args.ssh_args);

    // exec() replaces the process image and only returns on failure.
    let err = ssh.exec();
    Err(anyhow!("failed to exec ssh: {err}"))
}

async fn run_ls(client: &Client, args: LsArgs) -> Result<()> {
    let matches = ec2::match_instances(client, &args.query).await?;
    if matches.is_empty() {
        die("No matches found");
    }

    let rendered: Vec<String> = if args.custom_format {
        let lines: Result<Vec<String>> = matches
            .iter()
            .map(|instance| format::render_template(&args.formatter, instance))
            .collect();
        match lines {
            Ok(lines) => lines,
            Err(e) => die(&e.to_string()),
        }
    } else {
        match format::lookup(&args.formatter) {
            Some(formatter) => matches.iter().map(formatter).collect(),
            None => die(&format!("unknown formatter: {}", args.formatter)),
        }
    };

    println!("{}", rendered.join(&args.delim));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn region_defaults_to_us_east_1() {
        let cli = Cli::try_parse_from(["ec2", "ls", "web"]).unwrap();
        assert_eq!(cli.region, "us-east-1");
    }

    #[test]
    fn region_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["ec2", "ssh", "-r", "eu-west-1", "web"]).unwrap();
        assert_eq!(cli.region, "eu-west-1");
    }

    #[test]
    fn ssh_forwards_trailing_arguments_verbatim() {
        let cli =
            Cli::try_parse_from(["ec2", "ssh", "-l", "admin", "web", "-v", "uptime"]).unwrap();
        let Commands::Ssh(args) = cli.command else {
            panic!("expected ssh");
        };
        assert_eq!(args.query, "web");
        assert_eq!(args.login.as_deref(), Some("admin"));
        assert!(!args.prefer_public_ip);
        assert_eq!(args.ssh_args, ["-v", "uptime"]);
    }

    #[test]
    fn ssh_pick_is_bounded() {
        assert!(Cli::try_parse_from(["ec2", "ssh", "-n", "4", "web"]).is_ok());
        assert!(Cli::try_parse_from(["ec2", "ssh", "-n", "0", "web"]).is_err());
        assert!(Cli::try_parse_from(["ec2", "ssh", "-n", "1000000", "web"]).is_err());
    }

    #[test]
    fn ls_defaults() {
        let cli = Cli::try_parse_from(["ec2", "ls", "web"]).unwrap();
        let Commands::Ls(args) = cli.command else {
            panic!("expected ls");
        };
        assert_eq!(args.query, "web");
        assert_eq!(args.formatter, "extended_private");
        assert_eq!(args.delim, "\n");
        assert!(!args.custom_format);
    }

    #[test]
    fn ls_custom_format_flag() {
        let cli = Cli::try_parse_from([
            "ec2",
            "ls",
            "-c",
            "-f",
            "{name}:{private_ip}",
            "-d",
            ", ",
            "web",
        ])
        .unwrap();
        let Commands::Ls(args) = cli.command else {
            panic!("expected ls");
        };
        assert!(args.custom_format);
        assert_eq!(args.formatter, "{name}:{private_ip}");
        assert_eq!(args.delim, ", ");
    }
}
