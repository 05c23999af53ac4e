use anyhow::Context;
use clap::Parser;
use msdb_client::config::cli::{json_argument, json_object_argument};
use msdb_client::config::Command;
use msdb_client::utils::{logger, validation::Validate};
use msdb_client::{
    ApiClient, CliConfig, FetchedCalculation, FieldSchema, SimanCalculation, Transport,
    UploadOutcome,
};
use serde_json::Value;

fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(2);
        }
    };

    let outcome = if config.session.persistent {
        ApiClient::session(&config, |client| run(client, &cli.command))
            .map_err(anyhow::Error::from)
            .and_then(|result| result)
    } else {
        let mut client = ApiClient::new(&config);
        run(&mut client, &cli.command)
    };

    let exit_code = match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            tracing::error!("❌ {:#}", e);
            eprintln!("❌ {:#}", e);
            2
        }
    };
    std::process::exit(exit_code);
}

fn print_json(value: &Value) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(true)
}

fn print_outcome(outcome: &UploadOutcome) -> bool {
    match outcome {
        UploadOutcome::Created { id } => {
            println!("✅ Chemical card created: {}", id);
            true
        }
        UploadOutcome::Failed(failure) => {
            match failure.status {
                Some(status) => eprintln!("❌ HTTP {}: {}", status, failure.detail),
                None => eprintln!("❌ {:?}: {}", failure.category, failure.detail),
            }
            false
        }
    }
}

fn run<T: Transport>(client: &mut ApiClient<T>, command: &Command) -> anyhow::Result<bool> {
    if matches!(command, Command::Fields) {
        println!("{}", FieldSchema::chemical_card());
        return Ok(true);
    }

    if matches!(command, Command::Token) || (client.token().is_none() && client.has_credentials()) {
        // 帳號密碼已在建立 client 時帶入
        match (command, client.get_token(None, None)) {
            (Command::Token, Some(token)) => {
                println!("{}", token);
                return Ok(true);
            }
            (_, None) => return Ok(false),
            _ => {}
        }
    }

    match command {
        Command::Fields | Command::Token => Ok(true),
        Command::Database => match client.get_database() {
            Some(value) => print_json(&value),
            None => Ok(false),
        },
        Command::Compound { id } => match client.get_compound_by_id(id) {
            Some(value) => print_json(&value),
            None => Ok(false),
        },
        Command::Card { id } => match client.get_chemical_card(id) {
            Some(value) => print_json(&value),
            None => Ok(false),
        },
        Command::Download { id, output } => {
            msdb_client::utils::validation::validate_path(
                "output",
                &output.to_string_lossy(),
            )?;
            Ok(client.download_structure_file(id, output).is_some())
        }
        Command::Upload { file, info, extra } => {
            let main_info = info
                .as_deref()
                .map(|raw| json_object_argument("info", raw))
                .transpose()?;
            let extra_info = extra
                .as_deref()
                .map(|raw| json_argument("extra", raw))
                .transpose()?;
            let outcome =
                client.post_structure(file.as_deref(), main_info.as_ref(), extra_info.as_ref());
            Ok(print_outcome(&outcome))
        }
        Command::SubmitCalc {
            file,
            calc,
            info,
            extra,
        } => {
            let calc: SimanCalculation = serde_json::from_value(json_argument("calc", calc)?)
                .context("calculation does not match the siman_calculation schema")?;
            let main_info = info
                .as_deref()
                .map(|raw| json_object_argument("info", raw))
                .transpose()?;
            let extra_info = extra
                .as_deref()
                .map(|raw| json_argument("extra", raw))
                .transpose()?;
            let outcome = client.submit_calculation(
                Some(&calc),
                Some(file.as_path()),
                extra_info.as_ref(),
                main_info.as_ref(),
            );
            Ok(print_outcome(&outcome))
        }
        Command::FetchCalc { id } => match client.fetch_calculation::<SimanCalculation>(id) {
            Some(FetchedCalculation::Calculation(calc)) => {
                print_json(&serde_json::to_value(&calc)?)
            }
            Some(FetchedCalculation::RawRecord(card)) => print_json(&card),
            None => Ok(false),
        },
    }
}
