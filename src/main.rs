use anyhow::Result;
use clap::Parser;

use ability_cards::{CardClass, PageGrid};

#[derive(Parser, Debug)]
#[command(
    name = "ability-cards",
    version,
    about = "Render ability cards onto templates and tile them into printable pages"
)]
struct Cli {
    /// Card class to build (fighter, ranger, wizard, monk); repeatable, default all
    #[arg(short = 'c', long = "class")]
    class: Vec<CardClass>,

    /// Skip records below this level
    #[arg(short = 'm', long = "min-level", default_value_t = 1)]
    min_level: i64,

    /// Only build records whose file stem matches this glob; repeatable
    #[arg(short = 'n', long = "include")]
    include: Vec<String>,

    /// Cards per page as COLUMNSxROWS (default from settings [pages])
    #[arg(short = 'g', long = "grid")]
    grid: Option<PageGrid>,

    /// Page folder under the output directory
    #[arg(short = 'p', long = "pages-folder", default_value = "pages")]
    pages_folder: String,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Draw box borders and anchors on every card
    #[arg(long = "debug-boxes")]
    debug_boxes: bool,

    /// Worker threads (default: CPU count)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ability_cards::logging::init(cli.verbose)?;

    let summary = ability_cards::run(ability_cards::Config {
        classes: cli.class,
        minimum_level: cli.min_level,
        include: cli.include,
        grid: cli.grid,
        pages_folder: cli.pages_folder,
        settings_path: cli.read_settings,
        debug_boxes: cli.debug_boxes,
        jobs: cli.jobs,
    })?;

    println!(
        "{} cards, {} pages",
        summary.cards.len(),
        summary.pages.len()
    );
    for page in &summary.pages {
        println!("{}", page.display());
    }
    Ok(())
}
