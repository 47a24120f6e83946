//! nexus-lingo 命令行
//!
//! 对本地 SQLite 存储执行快照导出、合并与导入，并查看学习统计。

use std::io::Read;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nexus_lingo::config::Config;
use nexus_lingo::logging::init_tracing;
use nexus_lingo::storage::{
    LevelProgress, ProficiencyLevel, Storage, StorageError, StorageResult, TargetLanguage,
};

#[derive(Parser)]
#[command(name = "nexus-lingo")]
#[command(about = "Local progress store with snapshot sync", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a snapshot token of all local data
    Export,

    /// Merge a snapshot token into local data ("-" or omitted reads stdin)
    Merge { token: Option<String> },

    /// Overwrite local data with a snapshot token (legacy)
    Import { token: Option<String> },

    /// Show XP, level and skill ratings
    Stats,

    /// Show or update the learner profile
    Profile {
        #[arg(long)]
        username: Option<String>,

        /// A2, B1, B2, C1 or C2
        #[arg(long, value_parser = parse_level)]
        level: Option<ProficiencyLevel>,

        /// English, French, Italian or Spanish
        #[arg(long, value_parser = parse_language)]
        language: Option<TargetLanguage>,

        /// Advance to the next proficiency level (wraps after C2)
        #[arg(long, conflicts_with = "level")]
        cycle_level: bool,
    },
}

fn parse_level(raw: &str) -> Result<ProficiencyLevel, String> {
    ProficiencyLevel::parse(raw).ok_or_else(|| format!("unknown level: {raw}"))
}

fn parse_language(raw: &str) -> Result<TargetLanguage, String> {
    TargetLanguage::parse(raw).ok_or_else(|| format!("unknown language: {raw}"))
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config);

    let cli = Cli::parse();

    let storage = match Storage::open(&config.db_path) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!(error = %e, path = %config.db_path.display(), "failed to open storage");
            return ExitCode::FAILURE;
        }
    };

    match run(&storage, cli.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(storage: &Storage, command: Command) -> StorageResult<ExitCode> {
    match command {
        Command::Export => {
            println!("{}", storage.sync().export()?);
        }
        Command::Merge { token } => {
            let token = read_token(token)?;
            let report = storage.sync().merge(&token);
            println!("{}", report.summary);
            if !report.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Import { token } => {
            let token = read_token(token)?;
            if !storage.sync().import(&token) {
                eprintln!("import failed: invalid snapshot token");
                return Ok(ExitCode::FAILURE);
            }
            println!("imported");
        }
        Command::Stats => {
            let stats = storage.stats().get_stats()?;
            let progress = LevelProgress::from_stats(&stats);
            let out = serde_json::json!({
                "stats": stats,
                "progress": progress,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Profile {
            username,
            level,
            language,
            cycle_level,
        } => {
            let repo = storage.profile();
            if cycle_level {
                repo.cycle_level()?;
            }

            let mut profile = repo.get_profile()?;
            let changed = username.is_some() || level.is_some() || language.is_some();
            if let Some(username) = username {
                profile.username = username;
            }
            if let Some(level) = level {
                profile.level = level;
            }
            if let Some(language) = language {
                profile.target_language = language;
            }
            if changed {
                repo.save_profile(&profile)?;
            }

            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// 从参数或 stdin 读取令牌
fn read_token(arg: Option<String>) -> StorageResult<String> {
    match arg {
        Some(token) if token != "-" => Ok(token),
        _ => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            if buf.trim().is_empty() {
                return Err(StorageError::Decode("stdin 中没有令牌".to_string()));
            }
            Ok(buf)
        }
    }
}
