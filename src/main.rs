// Copyright (c) 2025 Sean McNamara <smcnam@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod app;
mod changelog;
mod cli;
mod codegen;
mod commands;
mod config;
mod constants;
mod error;
mod git;
mod github;
mod logger;
mod menu;
mod obfuscate;
mod openrouter;
mod prompts;
mod roadmap;
mod scaffold;
mod store;
#[cfg(test)]
mod testutil;
mod wakelock;
mod workflows;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::app::App;
use crate::cli::{Cli, Commands};
use crate::commands::*;
use crate::config::{Config, Settings};
use crate::constants::SETTINGS_FILE;
use crate::menu::Console;

fn main() -> Result<()> {
    // Handle Ctrl+C gracefully. While the menu is drawn, raw mode delivers
    // Ctrl+C as a key event instead.
    ctrlc::set_handler(|| {
        println!("\nInterrupted. Exiting.");
        std::process::exit(130);
    })
    .context("Error setting Ctrl-C handler")?;

    let cli = Cli::parse();

    // Load config from specified path or default grepo.toml
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
    let config = Config::load(&config_path)?;
    let settings = Settings::resolve(&cli, &config)?;
    logger::init(&settings.log_file)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "grepo starting");

    let mut app = App::new(settings);
    if let Some(warning) = app.load_active_user()? {
        eprintln!("Warning: {}", warning);
    }

    match cli.command {
        Some(Commands::Login {
            username,
            token,
            no_verify,
        }) => cmd_login(&mut app, username, token, no_verify),
        Some(Commands::Users) => cmd_users(&app),
        Some(Commands::Use { name }) => cmd_use(&mut app, &name),
        Some(Commands::Repos { remote }) => cmd_repos(&app, remote),
        Some(Commands::Status) => cmd_status(&mut app),
        Some(Commands::Create { name }) => cmd_create(&mut app, &name),
        Some(Commands::Roadmap { path }) => cmd_roadmap(&mut app, &path),
        Some(Commands::Issues { path, yes }) => cmd_issues(&mut app, &path, yes),
        Some(Commands::Models) => cmd_models(&app),
        None => run_menu(&mut app),
    }
}

fn run_menu(app: &mut App) -> Result<()> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!(
            "The interactive menu needs a terminal. Use a subcommand instead (see `grepo --help`)."
        );
    }
    if app.user.is_none() {
        let mut console = Console::stdio();
        workflows::users::first_time_setup(app, &mut console)?;
    }
    menu::engine::run(workflows::main_menu(), app)
}
