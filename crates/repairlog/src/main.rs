//! `replog` - CLI for repairlog
//!
//! This binary flattens and renders repair record files, and hosts the
//! interactive repair desk shell.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use repairlog::cli::{
    Cli, Command, ConfigCommand, FlattenCommand, RenderCommand, Shell, ShellCommand,
};
use repairlog::flatten::declared_keys;
use repairlog::record::read_forms;
use repairlog::{
    flatten, init_logging, Config, DocumentRenderer, RecordStore, RepairDesk,
    TagTemplateRenderer,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Flatten(cmd) => handle_flatten(&config, &cmd),
        Command::Render(cmd) => handle_render(&config, cmd),
        Command::Shell(cmd) => handle_shell(&config, cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn handle_flatten(config: &Config, cmd: &FlattenCommand) -> Result<()> {
    let forms = read_forms(&cmd.file)?;
    let mut store = RecordStore::new();
    store
        .extend(forms)
        .with_context(|| format!("loading records from {}", cmd.file.display()))?;
    let records = store.list();

    if cmd.json {
        let contexts: Vec<_> = records.iter().map(|record| flatten(record)).collect();
        let json = match contexts.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            _ => serde_json::to_string_pretty(&contexts)?,
        };
        println!("{json}");
        return Ok(());
    }

    for (index, record) in records.iter().enumerate() {
        if index > 0 {
            println!();
        }
        if records.len() > 1 {
            println!("# record {} (SN: {})", record.id, record.sn());
        }
        if cmd.keys {
            let keys = declared_keys(record);
            for key in &keys {
                println!("{key}");
            }
            warn_unresolved_tags(config, cmd, record.id, &keys)?;
        } else {
            for (key, value) in flatten(record).iter() {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}

fn warn_unresolved_tags(
    config: &Config,
    cmd: &FlattenCommand,
    id: u64,
    keys: &[String],
) -> Result<()> {
    let template = cmd
        .template
        .clone()
        .unwrap_or_else(|| config.template_path());
    let renderer = TagTemplateRenderer::new(template);
    let Some(unresolved) = renderer.unresolved_tags(keys)? else {
        return Ok(());
    };
    if !unresolved.is_empty() {
        eprintln!(
            "warning: record {id}: {} has tags without a value: {}",
            renderer.template_path().display(),
            unresolved.join(", ")
        );
    }
    Ok(())
}

fn handle_render(config: &Config, cmd: RenderCommand) -> Result<()> {
    let template = cmd.template.unwrap_or_else(|| config.template_path());
    let output_dir = cmd
        .output
        .unwrap_or_else(|| config.export.output_dir.clone());

    let renderer = TagTemplateRenderer::new(template.clone());
    if !renderer.template_available() {
        eprintln!(
            "warning: template not found at {}; no documents produced",
            template.display()
        );
        return Ok(());
    }

    let forms = read_forms(&cmd.file)?;
    let mut desk = RepairDesk::new(renderer, config.export.clone());
    desk.load("", forms)
        .with_context(|| format!("loading records from {}", cmd.file.display()))?;

    let ids: Vec<u64> = desk.store().list().iter().map(|record| record.id).collect();
    for id in ids {
        let Some(document) = desk
            .export(id)
            .with_context(|| format!("rendering record {id}"))?
        else {
            continue;
        };
        let path = document.write_to(&output_dir)?;
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_shell(config: &Config, cmd: ShellCommand) -> Result<()> {
    let renderer = TagTemplateRenderer::new(config.template_path());
    if !renderer.template_available() {
        eprintln!(
            "warning: template not found at {}; export will not produce documents",
            renderer.template_path().display()
        );
    }

    let mut desk = RepairDesk::new(renderer, config.export.clone());
    if let Some(path) = &cmd.load {
        let operator = cmd.user.as_deref().unwrap_or_default();
        let loaded = desk
            .load(operator, read_forms(path)?)
            .with_context(|| format!("loading records from {}", path.display()))?;
        eprintln!("Loaded {loaded} records from {}", path.display());
    }

    println!("repairlog shell. Type 'help' for commands.");
    let output_dir = cmd
        .output
        .unwrap_or_else(|| config.export.output_dir.clone());
    let mut shell = Shell::new(desk, config.auth.clone(), output_dir, io::stdout().lock());

    if let Some(user) = &cmd.user {
        let password = cmd.password.as_deref().unwrap_or_default();
        shell
            .login(user, password)
            .with_context(|| format!("logging in as {user}"))?;
    }

    shell.run(io::stdin().lock())?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Template]");
                println!("  Path:               {}", config.template_path().display());
                println!();
                println!("[Export]");
                println!("  Output directory:   {}", config.export.output_dir.display());
                println!("  File prefix:        {}", config.export.file_prefix);
                println!("  Include date:       {}", config.export.include_date);
                println!();
                println!("[Auth]");
                println!("  Admin user:         {}", config.auth.admin_username);
                println!("  User:               {}", config.auth.user_username);
                println!(
                    "  User password:      {}",
                    if config.auth.user_password.is_some() {
                        "required"
                    } else {
                        "not required"
                    }
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
