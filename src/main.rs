use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dao_contract::{
    config::Config,
    dao,
    ethereum::{artifacts::ContractDefinition, utils},
    Artifact, BindingError, ContractClass, ContractInstance, Invocation, Provider,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries results only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let config_path = match matches.get_one::<String>("config") {
        Some(path) => Some(path.into()),
        None => Config::default_config_path().ok().filter(|path| path.exists()),
    };
    let mut config = Config::load_or_default(config_path).await;

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(network) = matches.get_one::<String>("network") {
        config.network = Some(network.clone());
    }
    if let Some(from) = matches.get_one::<String>("from") {
        config.defaults.from = Some(from.clone());
    }
    if let Some(timeout_ms) = matches.get_one::<u64>("timeout") {
        config.synchronization.timeout_ms = *timeout_ms;
    }

    let class = load_class(&config).await?;
    config.apply_to(&class)?;

    let Some((command, sub)) = matches.subcommand() else {
        return Err(anyhow!("No command given, see --help"));
    };

    if command == "networks" {
        return print_json(&class.networks());
    }

    class.set_provider(Provider::http(&config.rpc_url)?);
    info!("Using RPC endpoint {}", config.rpc_url);

    match command {
        "info" => {
            if let Err(e) = class.resolve_network().await {
                warn!("Could not resolve network, showing the default entry: {}", e);
            }
            print_json(&class.info())
        }
        "deploy" => {
            if let Err(e) = class.resolve_network().await {
                warn!("Could not resolve network, deploying the default entry: {}", e);
            }
            let instance = class.deploy(arguments(sub)).await.map_err(explain)?;
            print_json(&json!({
                "address": instance.address(),
                "transaction_hash": instance.transaction_hash(),
            }))
        }
        "call" | "send" | "estimate" => {
            let instance = instance(&class, &matches).await?;
            let name = required(sub, "function")?;
            let function = instance.function(name)?;
            let args = arguments(sub);

            let result = match command {
                "call" => json!(function.call(args).await.map_err(explain)?),
                "estimate" => json!(function.estimate_gas(args).await.map_err(explain)?),
                _ if sub.get_flag("no-wait") => {
                    json!({ "transaction_hash": function.send_transaction(args).await.map_err(explain)? })
                }
                _ => {
                    let outcome = function.transact(args).await.map_err(explain)?;
                    if !outcome.receipt.succeeded() {
                        print_json(&json!(Invocation::Confirmed(outcome.clone())))?;
                        return Err(anyhow!("Transaction {} reverted", outcome.transaction_hash));
                    }
                    json!(Invocation::Confirmed(outcome))
                }
            };
            print_json(&result)
        }
        "events" => {
            let instance = instance(&class, &matches).await?;
            let from_block = sub.get_one::<u64>("from-block").copied();
            let to_block = sub.get_one::<u64>("to-block").copied();

            let events = match sub.get_one::<String>("event") {
                Some(name) => instance.event(name)?.get_logs(from_block, to_block).await,
                None => instance.all_events(from_block, to_block).await,
            }
            .map_err(explain)?;
            print_json(&events)
        }
        other => Err(anyhow!("Unknown command: {}", other)),
    }
}

fn cli() -> Command {
    let function_args = || {
        [
            Arg::new("function")
                .value_name("FUNCTION")
                .help("Contract function name")
                .required(true),
            Arg::new("args")
                .value_name("ARGS")
                .help("Arguments as JSON values; a trailing JSON object is taken as options")
                .num_args(0..)
                .allow_hyphen_values(true),
        ]
    };

    Command::new("dao-contract")
        .version("0.1.0")
        .about("Client for the DAO contract over JSON-RPC")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("ID")
                .global(true)
                .help("Artifact network id (detected from the node when omitted)"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("ADDRESS")
                .global(true)
                .help("Contract address (defaults to the artifact's deployed address)"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("ADDRESS")
                .global(true)
                .help("Sender account"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .global(true)
                .value_parser(clap::value_parser!(u64))
                .help("Receipt wait in milliseconds, 0 waits forever"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("networks").about("List artifact network ids"))
        .subcommand(Command::new("info").about("Show the active network entry and interface"))
        .subcommand(
            Command::new("call")
                .about("Run a function as a read-only call")
                .args(function_args()),
        )
        .subcommand(
            Command::new("send")
                .about("Submit a transaction and wait for its receipt")
                .args(function_args())
                .arg(
                    Arg::new("no-wait")
                        .long("no-wait")
                        .help("Return the transaction hash without waiting")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("estimate")
                .about("Estimate gas for a function")
                .args(function_args()),
        )
        .subcommand(
            Command::new("deploy")
                .about("Deploy a new contract instance")
                .arg(
                    Arg::new("args")
                        .value_name("ARGS")
                        .help("Constructor arguments as JSON values; a trailing JSON object is taken as options")
                        .num_args(0..)
                        .allow_hyphen_values(true),
                ),
        )
        .subcommand(
            Command::new("events")
                .about("Fetch contract logs")
                .arg(
                    Arg::new("event")
                        .long("event")
                        .value_name("NAME")
                        .help("Only this event"),
                )
                .arg(
                    Arg::new("from-block")
                        .long("from-block")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("to-block")
                        .long("to-block")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}

async fn load_class(config: &Config) -> Result<ContractClass> {
    match &config.artifact {
        Some(path) => {
            let artifact = Artifact::load_from_file(path).await?;
            info!("Loaded {} artifact from {:?}", artifact.contract_name, path);
            Ok(ContractClass::new(ContractDefinition::from_artifact(artifact)))
        }
        None => Ok(dao::dao()?),
    }
}

async fn instance(class: &ContractClass, matches: &ArgMatches) -> Result<ContractInstance> {
    let instance = match matches.get_one::<String>("address") {
        Some(address) => class.at(address)?,
        None => class.detect_deployed().await.map_err(explain)?,
    };
    Ok(instance)
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing {}", name))
}

/// JSON where it parses, a plain string otherwise.
fn arguments(matches: &ArgMatches) -> Vec<Value> {
    matches
        .get_many::<String>("args")
        .map(|args| {
            args.map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
                .collect()
        })
        .unwrap_or_default()
}

fn explain(err: BindingError) -> anyhow::Error {
    match err {
        BindingError::Transport(e) => anyhow!(utils::interpret_rpc_error(&e.message)),
        e @ BindingError::TransactionTimeout { .. } => {
            anyhow!(utils::interpret_rpc_error(&e.to_string()))
        }
        other => other.into(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
