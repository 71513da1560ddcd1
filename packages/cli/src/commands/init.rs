use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Source directory
    #[arg(short, long, default_value = "src")]
    pub src_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "!".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "Initializing Cascata project...".bright_blue().bold());

    let src_dir = PathBuf::from(cwd).join(&args.src_dir);
    if !src_dir.exists() {
        fs::create_dir_all(&src_dir)?;
        println!("  {} Created {}/", "✓".green(), args.src_dir);
    }

    let example_file = src_dir.join("example.xcss");
    if !example_file.exists() {
        let example_content = r#"@define {
    accent: #3366ff;
    pad: 8px;
}

@class button(tint: $accent) {
    padding: $pad calc($pad * 2);
    background: $tint;
    color: white;
    border: none;
    border-radius: 4px;

    &:hover {
        background: darken($tint, 15);
    }
}

.cta {
    extend: button;
}

.cta-danger {
    extend: button(tomato);
}
"#;
        fs::write(&example_file, example_content)?;
        println!("  {} Created example.xcss", "✓".green());
    }

    let config = Config {
        src_dir: args.src_dir.clone(),
        ..Config::default()
    };
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "Project initialized".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/example.xcss", args.src_dir);
    println!("  2. Run: cascata compile");
    println!("  3. Check output in dist/");

    Ok(())
}
