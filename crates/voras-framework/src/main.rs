//! `voras` command line

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use voras_creds::{Credentials, CredentialsMetadata};
use voras_dss::DssKeyAccess;
use voras_framework::{default_home, logging, BootstrapConfig, Framework, FrameworkError, Runner};

fn cli() -> Command {
    let namespace = || Arg::new("namespace").required(true).help("Namespace");
    let infix = || {
        Arg::new("infix")
            .long("infix")
            .action(ArgAction::Append)
            .help("Infix, most general first; repeat for more")
    };

    Command::new("voras")
        .version(voras_framework::VERSION)
        .about("Voras framework stores and feature runner")
        .subcommand_required(true)
        .arg(
            Arg::new("home")
                .long("home")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Voras home directory (default $VORAS_HOME or ~/.voras)"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("cps")
                .about("Configuration property store")
                .subcommand_required(true)
                .subcommand(
                    Command::new("get")
                        .about("Resolve the most specific property")
                        .arg(namespace())
                        .arg(Arg::new("prefix").required(true))
                        .arg(Arg::new("suffix").required(true))
                        .arg(infix()),
                )
                .subcommand(
                    Command::new("variants")
                        .about("List the keys a lookup would try, in order")
                        .arg(namespace())
                        .arg(Arg::new("prefix").required(true))
                        .arg(Arg::new("suffix").required(true))
                        .arg(infix()),
                )
                .subcommand(
                    Command::new("set")
                        .about("Set <namespace>.<name>")
                        .arg(namespace())
                        .arg(Arg::new("name").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete <namespace>.<name>")
                        .arg(namespace())
                        .arg(Arg::new("name").required(true)),
                )
                .subcommand(
                    Command::new("list")
                        .about("List a namespace, or every namespace")
                        .arg(Arg::new("namespace"))
                        .arg(Arg::new("prefix").long("prefix").default_value("")),
                ),
        )
        .subcommand(
            Command::new("dss")
                .about("Dynamic status store")
                .subcommand_required(true)
                .subcommand(
                    Command::new("get")
                        .arg(namespace())
                        .arg(Arg::new("key").required(true)),
                )
                .subcommand(
                    Command::new("put")
                        .arg(namespace())
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(
                    Command::new("swap")
                        .about("Compare-and-swap; without --expect the key must be absent")
                        .arg(namespace())
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true))
                        .arg(Arg::new("expect").long("expect")),
                )
                .subcommand(
                    Command::new("delete")
                        .arg(namespace())
                        .arg(Arg::new("key").required(true))
                        .arg(
                            Arg::new("prefix")
                                .long("prefix")
                                .action(ArgAction::SetTrue)
                                .help("Delete every key under KEY"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .arg(namespace())
                        .arg(Arg::new("prefix").long("prefix").default_value("")),
                ),
        )
        .subcommand(
            Command::new("creds")
                .about("Credentials")
                .subcommand_required(true)
                .subcommand(
                    Command::new("get")
                        .arg(Arg::new("id").required(true))
                        .arg(
                            Arg::new("reveal")
                                .long("reveal")
                                .action(ArgAction::SetTrue)
                                .help("Print secret fields"),
                        ),
                )
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("id").required(true))
                        .arg(Arg::new("username").long("username"))
                        .arg(Arg::new("password").long("password"))
                        .arg(Arg::new("token").long("token"))
                        .arg(Arg::new("description").long("description"))
                        .arg(Arg::new("user").long("user").help("Recorded as last updater")),
                )
                .subcommand(Command::new("delete").arg(Arg::new("id").required(true)))
                .subcommand(Command::new("list")),
        )
        .subcommand(
            Command::new("gherkin")
                .about("Feature files")
                .subcommand_required(true)
                .subcommand(
                    Command::new("parse")
                        .about("Parse and summarise a feature")
                        .arg(Arg::new("file").required(true).value_parser(value_parser!(PathBuf))),
                )
                .subcommand(
                    Command::new("run")
                        .about("Run a feature as a new run")
                        .arg(Arg::new("file").required(true).value_parser(value_parser!(PathBuf)))
                        .arg(Arg::new("run-name").long("run-name"))
                        .arg(
                            Arg::new("json")
                                .long("json")
                                .action(ArgAction::SetTrue)
                                .help("Print the report as JSON"),
                        )
                        .arg(
                            Arg::new("access-log")
                                .long("access-log")
                                .value_parser(value_parser!(PathBuf))
                                .help("Write resolved CPS properties here"),
                        ),
                ),
        )
}

fn main() {
    let matches = cli().get_matches();

    if let Err(e) = logging::init(matches.get_flag("log-json")) {
        eprintln!("logging setup failed: {e}");
    }

    let code = match run(&matches) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            eprintln!("error: {e:#}");
            let fatal = e
                .downcast_ref::<FrameworkError>()
                .is_some_and(FrameworkError::is_fatal);
            if fatal {
                2
            } else {
                1
            }
        }
    };
    std::process::exit(code);
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> &'a str {
    args.get_one::<String>(name).map_or("", String::as_str)
}

fn infixes(args: &ArgMatches) -> Vec<String> {
    args.get_many::<String>("infix")
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn framework(matches: &ArgMatches, run_name: Option<&String>) -> anyhow::Result<Framework> {
    let home = matches
        .get_one::<PathBuf>("home")
        .cloned()
        .unwrap_or_else(default_home);
    let mut config = BootstrapConfig::load(&home)
        .with_context(|| format!("loading bootstrap from {}", home.display()))?;
    if let Some(name) = run_name {
        config = config.with_run_name(name.clone());
    }
    Ok(Framework::initialise(config)?)
}

fn run(matches: &ArgMatches) -> anyhow::Result<i32> {
    match matches.subcommand() {
        Some(("cps", sub)) => cps(&framework(matches, None)?, sub),
        Some(("dss", sub)) => dss(&framework(matches, None)?, sub),
        Some(("creds", sub)) => creds(&framework(matches, None)?, sub),
        Some(("gherkin", sub)) => gherkin(matches, sub),
        _ => bail!("unknown command"),
    }
}

fn cps(fw: &Framework, matches: &ArgMatches) -> anyhow::Result<i32> {
    match matches.subcommand() {
        Some(("get", args)) => {
            let service = fw.cps_namespace(arg(args, "namespace"))?;
            match service.get_property(arg(args, "prefix"), arg(args, "suffix"), infixes(args).as_slice())? {
                Some(value) => {
                    println!("{value}");
                    Ok(0)
                }
                None => Ok(1),
            }
        }
        Some(("variants", args)) => {
            let service = fw.cps_namespace(arg(args, "namespace"))?;
            for key in
                service.report_property_variants(arg(args, "prefix"), arg(args, "suffix"), infixes(args).as_slice())?
            {
                println!("{key}");
            }
            Ok(0)
        }
        Some(("set", args)) => {
            fw.cps_namespace(arg(args, "namespace"))?
                .set_property(arg(args, "name"), arg(args, "value"))?;
            Ok(0)
        }
        Some(("delete", args)) => {
            fw.cps_namespace(arg(args, "namespace"))?
                .delete_property(arg(args, "name"))?;
            Ok(0)
        }
        Some(("list", args)) => {
            match args.get_one::<String>("namespace") {
                Some(namespace) => {
                    let service = fw.cps_namespace(namespace)?;
                    for (key, value) in service.get_prefixed_properties(arg(args, "prefix"))? {
                        println!("{namespace}.{key}={value}");
                    }
                }
                None => {
                    for namespace in fw.cps().namespaces()? {
                        println!("{namespace}");
                    }
                }
            }
            Ok(0)
        }
        _ => bail!("unknown cps command"),
    }
}

fn dss(fw: &Framework, matches: &ArgMatches) -> anyhow::Result<i32> {
    let Some((command, args)) = matches.subcommand() else {
        bail!("missing dss command");
    };
    let dss = fw.dss(arg(args, "namespace"))?;
    match command {
        "get" => match dss.get(arg(args, "key"))? {
            Some(value) => {
                println!("{value}");
                Ok(0)
            }
            None => Ok(1),
        },
        "put" => {
            dss.put(arg(args, "key"), arg(args, "value"))?;
            Ok(0)
        }
        "swap" => {
            let expected = args.get_one::<String>("expect").map(String::as_str);
            let swapped = dss.put_swap(arg(args, "key"), expected, arg(args, "value"))?;
            println!("{}", if swapped { "swapped" } else { "unchanged" });
            Ok(i32::from(!swapped))
        }
        "delete" => {
            if args.get_flag("prefix") {
                dss.delete_prefix(arg(args, "key"))?;
            } else {
                dss.delete(arg(args, "key"))?;
            }
            Ok(0)
        }
        "list" => {
            for (key, value) in dss.get_prefix(arg(args, "prefix"))? {
                println!("{key}={value}");
            }
            Ok(0)
        }
        _ => bail!("unknown dss command"),
    }
}

fn creds(fw: &Framework, matches: &ArgMatches) -> anyhow::Result<i32> {
    let service = fw.credentials();
    match matches.subcommand() {
        Some(("get", args)) => {
            let Some(stored) = service.get(arg(args, "id"))? else {
                return Ok(1);
            };
            println!("id: {}", stored.id);
            println!("kind: {}", stored.credentials.kind());
            if let Some(description) = &stored.metadata.description {
                println!("description: {description}");
            }
            if let Some(time) = stored.metadata.last_updated_time {
                println!("last updated: {}", time.to_rfc3339());
            }
            if let Some(user) = &stored.metadata.last_updated_user {
                println!("last updated by: {user}");
            }
            for (field, value) in stored.credentials.fields() {
                if field == voras_creds::model::field::USERNAME || args.get_flag("reveal") {
                    println!("{field}: {value}");
                } else {
                    println!("{field}: {}", voras_cps::REDACTED);
                }
            }
            Ok(0)
        }
        Some(("set", args)) => {
            let owned = |name: &str| args.get_one::<String>(name).cloned();
            let Some(credentials) =
                Credentials::from_fields(owned("username"), owned("password"), owned("token"))
            else {
                bail!("credentials need --username or --token");
            };
            let mut metadata = CredentialsMetadata::default().with_last_updated_time(Utc::now());
            if let Some(description) = owned("description") {
                metadata = metadata.with_description(description);
            }
            if let Some(user) = owned("user") {
                metadata = metadata.with_last_updated_user(user);
            }
            service.set(arg(args, "id"), &credentials, &metadata)?;
            Ok(0)
        }
        Some(("delete", args)) => {
            service.delete(arg(args, "id"))?;
            Ok(0)
        }
        Some(("list", _)) => {
            for stored in service.list()? {
                println!(
                    "{}\t{}\t{}",
                    stored.id,
                    stored.credentials.kind(),
                    stored.metadata.description.as_deref().unwrap_or("")
                );
            }
            Ok(0)
        }
        _ => bail!("unknown creds command"),
    }
}

fn gherkin(global: &ArgMatches, matches: &ArgMatches) -> anyhow::Result<i32> {
    match matches.subcommand() {
        Some(("parse", args)) => {
            let Some(path) = args.get_one::<PathBuf>("file") else {
                bail!("missing feature file");
            };
            let feature = voras_gherkin::parse_file(path)?;
            println!("Feature: {}", feature.name);
            for scenario in &feature.scenarios {
                let rows = scenario.examples.as_ref().map_or(0, |t| t.rows.len());
                if scenario.is_outline() {
                    println!("  Scenario Outline: {} ({} steps, {rows} rows)", scenario.name, scenario.steps.len());
                } else {
                    println!("  Scenario: {} ({} steps)", scenario.name, scenario.steps.len());
                }
            }
            Ok(0)
        }
        Some(("run", args)) => {
            let Some(path) = args.get_one::<PathBuf>("file") else {
                bail!("missing feature file");
            };
            let fw = framework(global, args.get_one::<String>("run-name"))?;
            let report = Runner::new(fw).run_file(path)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?);
            } else {
                for method in &report.result.methods {
                    println!("{}: {}", method.name, method.status);
                }
                println!(
                    "{} {}: {}",
                    report.run_name,
                    report.result.name,
                    if report.result.passed { "passed" } else { "failed" }
                );
            }
            if let Some(out) = args.get_one::<PathBuf>("access-log") {
                std::fs::write(out, &report.access_log)
                    .with_context(|| format!("writing access log to {}", out.display()))?;
            }
            Ok(i32::from(!report.result.passed))
        }
        _ => bail!("unknown gherkin command"),
    }
}
