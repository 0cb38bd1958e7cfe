use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use narrative_core::prelude::*;
use narrative_core::CopyObjectRequest;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    Command::new("narrative")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Narrative and workspace object operations")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .env("NARRATIVE_CONFIG")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Service configuration file (TOML)"),
        )
        .arg(
            Arg::new("token")
                .long("token")
                .env("KB_AUTH_TOKEN")
                .hide_env_values(true)
                .global(true)
                .help("Auth token sent to the services"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .env("KB_USER_ID")
                .global(true)
                .help("User id owning created workspaces"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("list-objects")
                .about("List sets, workspace objects and palette items")
                .arg(
                    Arg::new("ws-id")
                        .long("ws-id")
                        .value_parser(value_parser!(u64))
                        .help("Workspace id"),
                )
                .arg(Arg::new("ws-name").long("ws-name").help("Workspace name"))
                .arg(
                    Arg::new("workspace")
                        .long("workspace")
                        .short('w')
                        .action(ArgAction::Append)
                        .help("Workspace id or name; repeatable"),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .short('t')
                        .action(ArgAction::Append)
                        .help("Type prefix to keep, e.g. KBaseGenomes.Genome; repeatable"),
                )
                .arg(
                    Arg::new("include-metadata")
                        .long("include-metadata")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("include-data-palettes")
                        .long("include-data-palettes")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("types")
                .about("Count objects per type")
                .arg(
                    Arg::new("workspace")
                        .long("workspace")
                        .short('w')
                        .action(ArgAction::Append)
                        .required(true)
                        .help("Workspace id or name; repeatable"),
                ),
        )
        .subcommand(
            Command::new("copy-narrative")
                .about("Copy a narrative into a new workspace")
                .arg(Arg::new("ref").long("ref").required(true).help("Narrative reference"))
                .arg(Arg::new("name").long("name").required(true).help("Name of the copy")),
        )
        .subcommand(
            Command::new("create")
                .about("Create a workspace with a new narrative")
                .arg(Arg::new("app").long("app").conflicts_with("method"))
                .arg(Arg::new("method").long("method"))
                .arg(
                    Arg::new("appparam")
                        .long("appparam")
                        .help("step,name,value triples separated by ';'"),
                )
                .arg(Arg::new("markdown").long("markdown"))
                .arg(
                    Arg::new("copydata")
                        .long("copydata")
                        .help("Object references to import, separated by ';'"),
                )
                .arg(
                    Arg::new("intro")
                        .long("intro")
                        .action(ArgAction::SetTrue)
                        .help("Start with the introductory markdown cell"),
                )
                .arg(Arg::new("title").long("title")),
        )
        .subcommand(
            Command::new("copy-object")
                .about("Copy one object into a workspace")
                .arg(Arg::new("ref").long("ref").required(true))
                .arg(
                    Arg::new("target-ws-id")
                        .long("target-ws-id")
                        .value_parser(value_parser!(u64)),
                )
                .arg(Arg::new("target-ws-name").long("target-ws-name"))
                .arg(Arg::new("target-name").long("target-name")),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn string(args: &ArgMatches, id: &str) -> Option<String> {
    args.get_one::<String>(id).cloned()
}

fn strings(args: &ArgMatches, id: &str) -> Option<Vec<String>> {
    args.get_many::<String>(id).map(|v| v.cloned().collect())
}

fn auth(matches: &ArgMatches) -> anyhow::Result<AuthContext> {
    let user = string(matches, "user").context("--user or KB_USER_ID is required for this command")?;
    Ok(AuthContext::new(user, string(matches, "token").unwrap_or_default()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(matches: ArgMatches) -> anyhow::Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .context("--config is required")?;
    let config = ServiceConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let token = string(&matches, "token");
    let collaborators = narrative_rpc::connect(&config, token.as_deref())?;
    let manager = NarrativeManager::new(collaborators, config.aggregator());
    tracing::debug!(palettes = config.palettes_enabled(), "manager ready");

    match matches.subcommand() {
        Some(("list-objects", args)) => {
            let params = ListObjectsWithSetsParams {
                ws_id: args.get_one::<u64>("ws-id").copied(),
                ws_name: string(args, "ws-name"),
                workspaces: strings(args, "workspace"),
                types: strings(args, "type"),
                include_metadata: args.get_flag("include-metadata"),
                include_data_palettes: args.get_flag("include-data-palettes"),
            };
            print_json(&manager.list_objects_with_sets(params).await?)
        }
        Some(("types", args)) => {
            let params = ListAvailableTypesParams {
                workspaces: strings(args, "workspace").unwrap_or_default(),
            };
            print_json(&manager.list_available_types(params).await?)
        }
        Some(("copy-narrative", args)) => {
            let params = CopyNarrativeParams {
                new_name: string(args, "name").unwrap_or_default(),
                narrative_ref: string(args, "ref").unwrap_or_default(),
            };
            print_json(&manager.copy_narrative(&auth(&matches)?, params).await?)
        }
        Some(("create", args)) => {
            let params = CreateNarrativeParams {
                app: string(args, "app"),
                method: string(args, "method"),
                appparam: string(args, "appparam"),
                markdown: string(args, "markdown"),
                copydata: string(args, "copydata"),
                include_intro_cell: args.get_flag("intro"),
                title: string(args, "title"),
                ..Default::default()
            };
            print_json(&manager.create_new_narrative(&auth(&matches)?, params).await?)
        }
        Some(("copy-object", args)) => {
            let request = CopyObjectRequest {
                target_ws_id: args.get_one::<u64>("target-ws-id").copied(),
                target_ws_name: string(args, "target-ws-name"),
                target_name: string(args, "target-name"),
                ..CopyObjectRequest::new(string(args, "ref").unwrap_or_default())
            };
            print_json(&manager.copy_object(request).await?)
        }
        Some((other, _)) => anyhow::bail!("unknown command {other}"),
        None => anyhow::bail!("no command given"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("log-json"));
    if let Err(e) = run(matches).await {
        tracing::error!(error = %e, "command failed");
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn list_objects_collects_repeated_flags() {
        let matches = cli()
            .try_get_matches_from([
                "narrative", "--config", "svc.toml", "list-objects", "-w", "12", "-w", "alice:data", "-t",
                "KBaseGenomes.Genome", "--include-data-palettes",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "list-objects");
        assert_eq!(strings(args, "workspace").unwrap(), vec!["12", "alice:data"]);
        assert_eq!(strings(args, "type").unwrap(), vec!["KBaseGenomes.Genome"]);
        assert!(args.get_flag("include-data-palettes"));
        assert!(!args.get_flag("include-metadata"));
    }

    #[test]
    fn create_rejects_app_with_method() {
        let result = cli().try_get_matches_from([
            "narrative", "--config", "svc.toml", "create", "--app", "a/b", "--method", "m/n",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let matches = cli()
            .try_get_matches_from([
                "narrative", "copy-narrative", "--ref", "5/1", "--name", "Copy", "--config", "svc.toml",
                "--user", "alice",
            ])
            .unwrap();
        assert_eq!(auth(&matches).unwrap().user_id, "alice");
    }
}
