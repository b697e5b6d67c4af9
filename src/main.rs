use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use corescope::cache::ImageCache;
use corescope::config::Config;
use corescope::draw::{CairoDriver, Driver, GraphicsContext, ImageLoader, ScriptDriver};
use corescope::scene::file::SceneFile;
use corescope::scene::{PageableScene, Paper, Scene};
use corescope::units::Length;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "corescope")]
#[command(
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CORESCOPE_GIT_HASH"), ")"),
    about = "Render core-sample tracks to images and documents"
)]
struct Cli {
    /// Read configuration from this file instead of ~/.config/corescope/config.toml
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene description file
    Render {
        /// Scene description (TOML)
        scene: PathBuf,

        /// Output file
        #[arg(long, short = 'o', value_name = "FILE")]
        output: PathBuf,

        /// Output format; inferred from the output extension when omitted
        #[arg(long, short = 'f', value_enum)]
        format: Option<Format>,

        /// Depth covered by one PDF page, e.g. "1 m"
        #[arg(long, value_name = "LENGTH")]
        units_per_page: Option<String>,

        /// Preferred scene width in pixels
        #[arg(long, short = 'w', value_name = "PX")]
        width: Option<f64>,

        /// Do not wait for image decodes; undecoded images render as placeholders
        #[arg(long, action = ArgAction::SetTrue)]
        draft: bool,
    },
    /// Write the documented example config to the config directory
    InitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Png,
    Pdf,
    Svg,
    Js,
}

impl Format {
    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            "svg" => Some(Self::Svg),
            "js" => Some(Self::Js),
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig => {
            let path = Config::create_default_file()?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Render {
            scene,
            output,
            format,
            units_per_page,
            width,
            draft,
        } => {
            let config = match &cli.config {
                Some(path) => Config::load_from(path)?,
                None => Config::load()?,
            };
            let format = format
                .or_else(|| Format::from_extension(&output))
                .ok_or_else(|| {
                    anyhow!(
                        "Cannot infer the output format of {}; pass --format",
                        output.display()
                    )
                })?;
            render(&config, &scene, &output, format, units_per_page, width, draft)
        }
    }
}

fn render(
    config: &Config,
    scene_path: &Path,
    output: &Path,
    format: Format,
    units_per_page: Option<String>,
    width: Option<f64>,
    draft: bool,
) -> Result<()> {
    let mut scene = SceneFile::load(scene_path)?.build(config);
    if let Some(width) = width {
        scene.set_preferred_width(Some(width));
    }

    let cache = Arc::new(ImageCache::new(&config.cache).context("Failed to start image cache")?);
    let loader = if draft {
        ImageLoader::interactive(cache.clone(), Arc::new(|| {}))
    } else {
        ImageLoader::blocking(cache.clone())
    };

    if format != Format::Pdf && units_per_page.is_some() {
        log::warn!("--units-per-page only applies to PDF output; ignoring it");
    }

    match format {
        Format::Pdf => {
            let text = units_per_page.unwrap_or_else(|| config.page.units_per_page.clone());
            let units_per_page = Length::parse_with_default(&text, scene.units())
                .with_context(|| format!("Invalid page length '{}'", text))?;
            let paper = Paper::from_config(config.page.paper, config.page.landscape);
            let mut driver = CairoDriver::pdf(output, paper.width, paper.height)?;
            let pages = {
                let mut pageable = PageableScene::new(&mut scene, paper, units_per_page);
                let mut ctx = GraphicsContext::with_loader(&mut driver, loader);
                pageable.render_pages(&mut ctx)
            };
            driver.dispose()?;
            log::info!("Wrote {} page(s) to {}", pages, output.display());
        }
        Format::Png | Format::Svg | Format::Js => {
            let (w, h) = document_size(&mut scene)?;
            let mut driver: Box<dyn Driver> = match format {
                Format::Png => Box::new(CairoDriver::png(output, w.ceil() as i32, h.ceil() as i32)?),
                Format::Svg => Box::new(CairoDriver::svg(output, w, h)?),
                _ => Box::new(ScriptDriver::to_file(output, w, h)?),
            };
            {
                let mut ctx = GraphicsContext::with_loader(driver.as_mut(), loader);
                scene.render_document(&mut ctx);
            }
            driver.dispose()?;
            log::info!("Wrote {:.0}x{:.0} scene to {}", w, h, output.display());
        }
    }

    let stats = cache.stats();
    log::debug!("Image cache: {:?}", stats);
    Ok(())
}

fn document_size(scene: &mut Scene) -> Result<(f64, f64)> {
    let (width, height) = scene.document_size();
    if width < 1.0 || height < 1.0 {
        return Err(anyhow!("Scene is empty; nothing to render"));
    }
    Ok((width, height))
}
