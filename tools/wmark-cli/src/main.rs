//! wmark CLI: command-line interface for stamping and batch watermarking.
//!
//! Usage:
//!   wmark stamp <IMAGE> [OPTIONS]     Watermark one image
//!   wmark apply <IMAGES>... [OPTIONS] Apply a saved layout to many images
//!   wmark presets <ACTION>            List, show or delete presets
//!   wmark log                         Show recent exports
//!   wmark check                       Check configuration and fonts

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "wmark",
    about = "Watermark images one at a time or in batches",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark a single image
    Stamp {
        /// Image to watermark
        image: PathBuf,

        /// Add a text watermark with this content
        #[arg(long)]
        text: Option<String>,

        /// Add a logo from this image file
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Text fill color (#rrggbb, rgb(), rgba())
        #[arg(long)]
        color: Option<String>,

        /// Opacity of the added watermark [0.0, 1.0]
        #[arg(long)]
        opacity: Option<f64>,

        /// Uniform scale of the added watermark
        #[arg(long)]
        scale: Option<f64>,

        /// Repeat the added watermark across the whole image
        #[arg(long)]
        tile: bool,

        /// Start from a saved preset
        #[arg(long)]
        preset: Option<String>,

        /// Save the final layout as a preset
        #[arg(long)]
        save_preset: Option<String>,

        /// Write the final layout to a JSON file
        #[arg(long)]
        save_layout: Option<PathBuf>,

        /// Output format (png, jpeg, webp or a mime type)
        #[arg(long)]
        format: Option<String>,

        /// Output quality (0-100, JPEG only)
        #[arg(long)]
        quality: Option<u8>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Apply one layout to many images and package them as a zip
    Apply {
        /// Images to watermark, in order
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Layout JSON file written by `stamp --save-layout`
        #[arg(long, conflicts_with = "preset", required_unless_present = "preset")]
        layout: Option<PathBuf>,

        /// Saved preset to apply
        #[arg(long)]
        preset: Option<String>,

        /// Output format (png, jpeg, webp or a mime type)
        #[arg(long)]
        format: Option<String>,

        /// Output quality (0-100, JPEG only)
        #[arg(long)]
        quality: Option<u8>,

        /// Skip images that fail and list them in the archive
        #[arg(long)]
        skip_failures: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Manage saved presets
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Show recent exports
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Clear the log instead of printing it
        #[arg(long)]
        clear: bool,
    },

    /// Check configuration, storage and font availability
    Check,
}

#[derive(Subcommand)]
enum PresetAction {
    /// List preset names
    List,

    /// Print a preset's layout
    Show {
        name: String,
    },

    /// Delete a preset
    Delete {
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = wmark_common::config::AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    wmark_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Stamp {
            image,
            text,
            logo,
            color,
            opacity,
            scale,
            tile,
            preset,
            save_preset,
            save_layout,
            format,
            quality,
            output,
        } => commands::stamp::run(
            &config,
            commands::stamp::StampArgs {
                image,
                text,
                logo,
                color,
                opacity,
                scale,
                tile,
                preset,
                save_preset,
                save_layout,
                format,
                quality,
                output,
            },
        ),
        Commands::Apply {
            images,
            layout,
            preset,
            format,
            quality,
            skip_failures,
            output,
        } => {
            commands::apply::run(
                &config,
                images,
                layout,
                preset,
                format,
                quality,
                skip_failures,
                output,
            )
            .await
        }
        Commands::Presets { action } => match action {
            PresetAction::List => commands::presets::list(&config),
            PresetAction::Show { name } => commands::presets::show(&config, &name),
            PresetAction::Delete { name } => commands::presets::delete(&config, &name),
        },
        Commands::Log { limit, clear } => commands::log::run(&config, limit, clear),
        Commands::Check => commands::check::run(&config),
    }
}
