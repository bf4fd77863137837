//! mqsec command line front end
//!
//! Run with: cargo run --features cli --bin mqsec -- --store <DIR> <QUEUE> <USER>
//!
//! Exit status: 0 right held, 1 right not held, 2 the check could not be made.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

use mqsec::{
    access_report, right_by_name, DirectorySource, MqsecError, PrincipalMap, QueuePath, QueueRight,
    Result, StaticResolver,
};

const LOG_ENV: &str = "MQSEC_LOG";
const DEFAULT_RIGHT: &str = "receive_message";

// ============================================================================
// Configuration
// ============================================================================

struct Config {
    store: PathBuf,
    computer: Option<String>,
    principals: Option<PathBuf>,
    queue: QueuePath,
    user: String,
    rights: Vec<(String, u32)>,
    json: bool,
    verbose: u8,
}

impl Config {
    fn from_matches(m: &ArgMatches) -> Result<Self> {
        let queue = m
            .get_one::<String>("queue")
            .ok_or_else(|| MqsecError::Config("missing queue".into()))?
            .parse::<QueuePath>()?;
        let user = m
            .get_one::<String>("user")
            .cloned()
            .ok_or_else(|| MqsecError::Config("missing user".into()))?;

        let names: Vec<String> = m
            .get_many::<String>("right")
            .map(|v| v.cloned().collect())
            .unwrap_or_else(|| vec![DEFAULT_RIGHT.to_string()]);
        let mut rights = Vec::with_capacity(names.len());
        for name in names {
            let bits = right_by_name(&name)
                .ok_or_else(|| MqsecError::Config(format!("unknown right {name:?}")))?;
            rights.push((name, bits));
        }

        Ok(Self {
            store: m
                .get_one::<PathBuf>("store")
                .cloned()
                .ok_or_else(|| MqsecError::Config("missing --store".into()))?,
            computer: m.get_one::<String>("computer").cloned(),
            principals: m.get_one::<PathBuf>("principals").cloned(),
            queue,
            user,
            rights,
            json: m.get_flag("json"),
            verbose: m.get_count("verbose"),
        })
    }

    fn required(&self) -> u32 {
        self.rights.iter().fold(0, |a, (_, b)| a | b)
    }
}

fn clap_command() -> Command {
    Command::new("mqsec")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check whether a user holds a right on a private message queue")
        .arg(
            Arg::new("store")
                .long("store")
                .short('s')
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true)
                .help("Directory holding <queue>.sd security descriptor files."),
        )
        .arg(
            Arg::new("computer")
                .long("computer")
                .value_name("NAME")
                .help("Computer name served by the store besides '.'."),
        )
        .arg(
            Arg::new("principals")
                .long("principals")
                .short('p')
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf))
                .help("JSON object mapping account names to SIDs."),
        )
        .arg(
            Arg::new("right")
                .long("right")
                .short('r')
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Right to test (default receive_message); repeatable."),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON."),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v debug, -vv trace)."),
        )
        .arg(
            Arg::new("queue")
                .value_name("QUEUE")
                .required(true)
                .help(r"Queue as name, computer\name or a direct format name."),
        )
        .arg(
            Arg::new("user")
                .value_name("USER")
                .required(true)
                .help("Account name or SID text."),
        )
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_resolver(path: Option<&PathBuf>) -> Result<StaticResolver> {
    let Some(path) = path else {
        return Ok(StaticResolver::new());
    };
    let map: PrincipalMap = serde_json::from_reader(BufReader::new(File::open(path)?))
        .map_err(|e| MqsecError::Config(format!("{}: {e}", path.display())))?;
    Ok(map.into())
}

fn run(cfg: &Config) -> Result<bool> {
    let mut source = DirectorySource::new(&cfg.store)?;
    if let Some(c) = &cfg.computer {
        source = source.with_computer(c);
    }
    let resolver = load_resolver(cfg.principals.as_ref())?;

    let report = access_report(&source, &resolver, &cfg.queue, &cfg.user, cfg.required())?;

    if cfg.json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| MqsecError::Config(format!("cannot encode report: {e}")))?;
        println!("{out}");
        return Ok(report.granted);
    }

    println!("{}", report.mask);
    for (name, bits) in &cfg.rights {
        if report.mask.contains(*bits) {
            println!("Has {name} access");
        } else {
            println!("Doesn't have {name} access");
        }
    }
    if report.mask.contains(QueueRight::GENERIC_ALL) {
        println!("(full control)");
    }
    Ok(report.granted)
}

fn main() -> ExitCode {
    let matches = clap_command().get_matches();
    let cfg = match Config::from_matches(&matches) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("mqsec: {e}");
            return ExitCode::from(2);
        }
    };
    init_logging(cfg.verbose);

    match run(&cfg) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}
