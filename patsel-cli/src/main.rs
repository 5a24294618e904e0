use std::env;
use std::fs;
use std::io;
use std::io::Write;

use anyhow::{anyhow, Error};
use clap::{App, Arg};
use env_logger::{fmt, Builder, Target};
use log::{error, info};
use log::{Level, LevelFilter, Record};

use patsel::cegar::{generate_pattern_collection, CegarConfig, CegarError};
use patsel_sas::SasParser;

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

pub fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("patsel")
        .version(env!("CARGO_PKG_VERSION"))
        .about("CEGAR pattern database collection generation for SAS+ planning tasks")
        .arg(Arg::with_name("INPUT").help("The input task in SAS+ format (stdin if omitted)"))
        .arg(
            Arg::with_name("max-refinements")
                .long("max-refinements")
                .takes_value(true)
                .default_value("infinity")
                .help("Maximum allowed number of refinements"),
        )
        .arg(
            Arg::with_name("max-pdb-size")
                .long("max-pdb-size")
                .takes_value(true)
                .default_value("1000000")
                .help(
                    "Maximum number of states in a single pattern database \
                     (not applied to initial goal variable patterns)",
                ),
        )
        .arg(
            Arg::with_name("max-collection-size")
                .long("max-collection-size")
                .takes_value(true)
                .default_value("infinity")
                .help(
                    "Limit for the total number of PDB entries across all PDBs \
                     (not applied to initial goal variable patterns)",
                ),
        )
        .arg(
            Arg::with_name("singleton-plans")
                .long("singleton-plans")
                .help("Use plans with a single operator per step instead of wildcard plans"),
        )
        .arg(
            Arg::with_name("max-time")
                .long("max-time")
                .takes_value(true)
                .default_value("infinity")
                .help("Maximum time in seconds for pattern generation"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .default_value("0")
                .help("Seed for the random number generator"),
        )
        .get_matches();

    let format = |buf: &mut fmt::Formatter, record: &Record| {
        if record.level() == Level::Info {
            writeln!(buf, "{}", record.args())
        } else {
            writeln!(buf, "{}: {}", record.level(), record.args())
        }
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .format(format)
        .filter(None, LevelFilter::Info);

    if let Ok(ref env_var) = env::var("PATSEL_LOG") {
        builder.parse_filters(env_var);
    }

    builder.init();

    info!("This is patsel {}", env!("CARGO_PKG_VERSION"));

    let config = CegarConfig {
        max_refinements: parse_limit(matches.value_of("max-refinements"), usize::MAX)?,
        max_pdb_size: parse_limit(matches.value_of("max-pdb-size"), u64::MAX)?,
        max_collection_size: parse_limit(matches.value_of("max-collection-size"), u64::MAX)?,
        wildcard_plans: !matches.is_present("singleton-plans"),
        max_time: match matches.value_of("max-time") {
            Some("infinity") | None => f64::INFINITY,
            Some(value) => value.parse()?,
        },
        seed: matches
            .value_of("seed")
            .unwrap_or("0")
            .parse()
            .map_err(|_| anyhow!("seed must be an unsigned integer"))?,
        blacklist: vec![],
    };

    let stdin = io::stdin();

    let input: Box<dyn io::Read> = match matches.value_of("INPUT") {
        Some(path) => {
            info!("Reading file '{}'", path);
            Box::new(fs::File::open(path)?)
        }
        None => {
            info!("Reading from stdin");
            Box::new(stdin.lock())
        }
    };

    let task = SasParser::parse(input)?;
    info!(
        "Parsed task with {} variables and {} operators",
        task.var_count(),
        task.operators().len()
    );

    if task.goals().is_empty() {
        return Err(anyhow!("task has no goal"));
    }

    match generate_pattern_collection(&task, config) {
        Ok(collection) => {
            for (pattern, pdb) in collection.iter() {
                println!("pattern {} with {} abstract states", pattern, pdb.size());
            }
            Ok(0)
        }
        Err(CegarError::Unsolvable) => {
            println!("task is unsolvable");
            Ok(20)
        }
        Err(err) => Err(err.into()),
    }
}

/// Parse an integer option that also accepts the word `infinity`.
fn parse_limit<T: std::str::FromStr>(value: Option<&str>, infinity: T) -> Result<T, Error> {
    match value {
        Some("infinity") | None => Ok(infinity),
        Some(value) => value
            .parse()
            .map_err(|_| anyhow!("expected an unsigned integer or 'infinity', found '{}'", value)),
    }
}
