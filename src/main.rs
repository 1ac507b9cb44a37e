use attiny_flasher::config::cli::Command;
use attiny_flasher::utils::error::ErrorSeverity;
use attiny_flasher::utils::{logger, validation::Validate};
use attiny_flasher::{
    build_command, validate, AppContext, CliConfig, FlashRequest, Flasher, FlasherError,
    FlasherSettings, OsKind, Platform, SystemProcessRunner, NO_PORTS_SENTINEL,
};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let toml = match cli.load_toml() {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("❌ Failed to load config file: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(2);
        }
    };
    let settings = cli.settings(&toml);

    if cli.log_json {
        logger::init_json_logger(cli.verbose, settings.log_level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, settings.log_level.as_deref());
    }
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = toml.validate().and_then(|_| settings.validate()) {
        tracing::error!("Configuration validation failed: {}", e);
        exit_with(&e);
    }

    if let Err(e) = run(&cli, &settings).await {
        match e.downcast_ref::<FlasherError>() {
            Some(flasher_error) => {
                tracing::error!(
                    "{} (Category: {:?}, Severity: {:?})",
                    flasher_error,
                    flasher_error.category(),
                    flasher_error.severity()
                );
                exit_with(flasher_error);
            }
            None => {
                tracing::error!("Unexpected failure: {:#}", e);
                eprintln!("❌ {:#}", e);
                std::process::exit(3);
            }
        }
    }
}

async fn run(cli: &CliConfig, settings: &FlasherSettings) -> anyhow::Result<()> {
    let platform = Platform::with_search_paths(OsKind::current(), &settings.search_paths);

    match &cli.command {
        Command::Ports { json } => {
            let ports = platform.list_ports();
            tracing::info!("Found {} serial port(s)", ports.len());
            if *json {
                println!("{}", serde_json::to_string_pretty(&ports)?);
            } else {
                for port in &ports {
                    println!("{}", port);
                }
            }
            Ok(())
        }
        Command::Detect { json } => {
            let ctx = AppContext::new(platform, settings)?;
            print_detection(&ctx, *json)
        }
        Command::Flash(args) => {
            let ctx = AppContext::new(platform, settings)?;
            flash(&ctx, args.dry_run).await
        }
    }
}

fn print_detection(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let hex_found = ctx.hex_file.is_file();

    if json {
        let report = serde_json::json!({
            "os": ctx.platform.os(),
            "toolchain": ctx.toolchain,
            "hex_file": ctx.hex_file,
            "hex_file_found": hex_found,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match (&ctx.toolchain.executable, &ctx.toolchain.config) {
        (Some(executable), Some(config)) => {
            println!("Avrdude:  Found: {}", executable.display());
            println!("Config:   {}", config.display());
        }
        _ => println!("Avrdude:  Not found - Please install Arduino IDE"),
    }
    let hex_status = if hex_found { "Found" } else { "Not Found" };
    println!("Hex File: {}: {}", hex_status, ctx.hex_file.display());
    Ok(())
}

async fn flash(ctx: &AppContext, dry_run: bool) -> anyhow::Result<()> {
    let port = ctx
        .resolve_port()
        .unwrap_or_else(|| NO_PORTS_SENTINEL.to_string());
    let request = FlashRequest::new(ctx.hex_file.clone(), port, ctx.toolchain.clone());

    if dry_run {
        let errors = validate(&request.hex_file, &request.toolchain, &request.port);
        if !errors.is_empty() {
            return Err(FlasherError::ValidationError { errors }.into());
        }
        tracing::info!("Dry run, avrdude will not be started");
        println!("{}", build_command(&request)?);
        return Ok(());
    }

    let flasher = Flasher::new(SystemProcessRunner::new());
    let session = flasher.start(request)?;
    let result = session
        .drain(
            |line| println!("{}", line),
            |result| tracing::debug!("Flash finished: {:?}", result),
        )
        .await;

    if result.succeeded {
        println!("✅ Bootloader flashed successfully!");
        Ok(())
    } else {
        Err(FlasherError::flash_failed(result.exit_code).into())
    }
}

fn exit_with(e: &FlasherError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2, // nothing was flashed
        ErrorSeverity::High => 1,                        // avrdude failed
        ErrorSeverity::Critical => 3,                    // internal fault
    };
    std::process::exit(exit_code);
}
