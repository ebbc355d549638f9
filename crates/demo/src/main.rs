use std::io::{self, Write};

use anyhow::{Result, bail};
use argtree::actions::{Add, List};
use argtree::resource::{FileResource, HttpResource, OpenMode, StdStream, UrlResource};
use argtree::types::{Choice, Constant, Integer, Number, Str};
use argtree::{Cli, Command, Matches, Opt, Positional, ResourceHandle, Slot, Value};
use tracing_subscriber::{EnvFilter, fmt};

fn main() {
    init_tracing();

    let cli = match build_cli() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = cli.run_env() {
        eprintln!("error: {err:#}");
        std::process::exit(err.exit_code());
    }
}

fn build_cli() -> Result<Cli> {
    let build = Command::new("build")
        .about("Build a target")
        .positional("target", Positional::new(Str).help("what to build"))?
        .option(
            "jobs",
            Opt::new(Integer)
                .short('j')
                .long("jobs")
                .default(1i64)
                .help("parallel jobs"),
        )?
        .option("release", Opt::switch().long("release"))?
        .option(
            "define",
            Opt::with_slots([Slot::new(Str), Slot::new(Str)])
                .short('D')
                .long("define")
                .action(List)
                .help("KEY VALUE pair, may be repeated"),
        )?
        .handler(print_matches);

    let deploy = Command::new("deploy")
        .about("Deploy files to an environment")
        .option("dry_run", Opt::switch().short('n').long("dry-run"))?
        .option("confirm", Opt::switch().long("confirm"))?
        .positional("env", Positional::new(Choice::strings(["staging", "production"])))?
        .positional("files", Positional::new(Str).remaining())?
        .handler(run_deploy);

    let cat = Command::new("cat")
        .about("Print files or http(s) URLs (`-` is stdin)")
        .positional(
            "files",
            Positional::new(UrlResource::new(OpenMode::Read)).min(1),
        )?
        .handler(run_cat);

    let sum = Command::new("sum")
        .about("Add numbers")
        .positional("total", Positional::new(Number::new()).min(1).action(Add))?
        .handler(run_sum);

    let root = Command::new("argtree-demo")
        .about("Sample tool built on argtree")
        .option(
            "verbose",
            Opt::new(Constant(Value::Int(1)))
                .short('v')
                .long("verbose")
                .action(Add),
        )?
        .option("tag", Opt::new(Str).short('t').long("tag").action(List))?
        .subcommand(build)?
        .subcommand(deploy)?
        .subcommand(cat)?
        .subcommand(sum)?;

    Ok(Cli::new(root))
}

fn print_matches(matches: &Matches) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, matches)?;
    writeln!(stdout)?;
    Ok(())
}

fn run_deploy(matches: &Matches) -> Result<()> {
    let env = matches.get_str("env").unwrap_or_default();
    if env == "production" && !matches.flag("dry_run") && !matches.flag("confirm") {
        bail!("refusing to deploy to production without --confirm");
    }
    tracing::debug!(env, "deploying");
    print_matches(matches)
}

fn copy_resource(handle: &ResourceHandle, out: &mut impl Write) -> Result<u64> {
    if let Some(copied) = handle.with(|file: &mut FileResource| io::copy(file, out)) {
        return Ok(copied?);
    }
    if let Some(copied) = handle.with(|stream: &mut StdStream| io::copy(stream, out)) {
        return Ok(copied?);
    }
    if let Some(copied) = handle.with(|body: &mut HttpResource| io::copy(body, out)) {
        return Ok(copied?);
    }
    bail!("{} is no longer open", handle.location())
}

fn run_cat(matches: &Matches) -> Result<()> {
    let mut stdout = io::stdout().lock();
    for file in matches.get_list("files").unwrap_or_default() {
        let Some(handle) = file.as_resource() else {
            continue;
        };
        let copied = copy_resource(handle, &mut stdout)?;
        tracing::debug!(location = handle.location(), bytes = copied, "copied");
        handle.close();
    }
    Ok(())
}

fn run_sum(matches: &Matches) -> Result<()> {
    match matches.get("total") {
        Some(total) => println!("{total}"),
        None => println!("0"),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
