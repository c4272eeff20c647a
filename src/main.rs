use clap::Parser;
use ui_match::cli::commands::{cmd_fingerprint, cmd_layers, cmd_query, cmd_recommend, cmd_select};
use ui_match::cli::config::{Cli, Commands, load_config, log_level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Query { dump, xpath, all } => {
            cmd_query(&dump, &xpath, all)?;
        }
        Commands::Layers {
            dump,
            hit,
            overlay_only,
        } => {
            cmd_layers(&dump, hit.as_deref(), overlay_only, &config)?;
        }
        Commands::Fingerprint { dump, xpath } => {
            cmd_fingerprint(&dump, &xpath)?;
        }
        Commands::Select {
            dump,
            protocol,
            execute,
            device,
            trace,
        } => {
            let all_ok = cmd_select(
                &dump,
                &protocol,
                execute,
                device.as_deref(),
                trace.as_deref(),
                &config,
            )?;
            if !all_ok {
                std::process::exit(1);
            }
        }
        Commands::Recommend {
            dump,
            xpath,
            container,
            endpoint,
        } => {
            cmd_recommend(
                &dump,
                &xpath,
                container.as_deref(),
                endpoint.as_deref(),
                &config,
            )?;
        }
    }

    Ok(())
}
