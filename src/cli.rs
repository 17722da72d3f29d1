use crate::basemap::Basemap;
use crate::cache::LocationCache;
use crate::config::{Config, load_config};
use crate::geocode::{Geocoder, resolve_places};
use crate::ir::collect_places;
use crate::layout::compute_map_layout;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_png, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tabimap",
    version,
    about = "Draw a travel map of stayed and visited places with relaxed labels"
)]
pub struct Args {
    /// Config file (JSON or JSON5); missing keys keep their defaults
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output file (svg/png)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format. Defaults to the output file extension, then png
    #[arg(short = 'e', long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// GeoJSON file with country outlines
    #[arg(long = "countries")]
    pub countries: Option<PathBuf>,

    /// GeoJSON file with first-level region outlines
    #[arg(long = "regions")]
    pub regions: Option<PathBuf>,

    /// Location cache file
    #[arg(long = "cache")]
    pub cache: Option<PathBuf>,

    /// Only use cached positions, never query the geocoder
    #[arg(long = "offline")]
    pub offline: bool,

    /// Write the computed layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// PNG pixel scale
    #[arg(long = "scale")]
    pub scale: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

impl Args {
    /// Overlay command-line values on the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.output {
            config.render.output = path.clone();
        }
        if let Some(path) = &self.countries {
            config.data.countries = path.clone();
        }
        if let Some(path) = &self.regions {
            config.data.regions = Some(path.clone());
        }
        if let Some(path) = &self.cache {
            config.data.cache = path.clone();
        }
        if let Some(width) = self.width {
            config.map.width = width;
        }
        if let Some(height) = self.height {
            config.map.height = height;
        }
        if let Some(scale) = self.scale {
            config.render.scale = scale;
        }
    }
}

pub fn output_format(explicit: Option<OutputFormat>, output: &Path) -> OutputFormat {
    if let Some(format) = explicit {
        return format;
    }
    match output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("svg") => OutputFormat::Svg,
        _ => OutputFormat::Png,
    }
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "net")]
fn make_geocoder(config: &Config) -> Result<Option<Box<dyn Geocoder>>> {
    let geocoder = crate::geocode::NominatimGeocoder::new(&config.geocoder)
        .context("failed to set up the geocoder")?;
    Ok(Some(Box::new(geocoder)))
}

#[cfg(not(feature = "net"))]
fn make_geocoder(_config: &Config) -> Result<Option<Box<dyn Geocoder>>> {
    warn!("built without the `net` feature, using cached positions only");
    Ok(None)
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    args.apply(&mut config);
    render_map(&config, args.offline, args.format, args.dump_layout.as_deref())
}

/// Resolve, lay out and write the map described by `config`.
pub fn render_map(
    config: &Config,
    offline: bool,
    format: Option<OutputFormat>,
    dump_layout: Option<&Path>,
) -> Result<()> {
    let places = collect_places(&config.places);
    info!(places = places.len(), "collected places");

    let mut cache = LocationCache::load(&config.data.cache);
    let mut geocoder = if offline {
        info!("offline mode, using cached positions only");
        None
    } else {
        make_geocoder(config)?
    };
    let resolved = resolve_places(
        &places,
        &mut cache,
        geocoder.as_mut().map(|g| g.as_mut() as &mut dyn Geocoder),
        &config.places.query_suffix,
    );
    if cache.is_dirty() {
        if let Err(err) = cache.save(&config.data.cache) {
            warn!(error = %err, "could not save the location cache");
        }
    }
    let distinct: HashSet<&str> = places.iter().map(|p| p.name.as_str()).collect();
    if resolved.is_empty() {
        anyhow::bail!("none of the {} places could be located", distinct.len());
    }
    info!(
        resolved = resolved.len(),
        missing = distinct.len().saturating_sub(resolved.len()),
        "places resolved"
    );

    let basemap = Basemap::load(
        &config.data.countries,
        config.data.regions.as_deref(),
        &config.map.country,
        &config.map.country_code,
    )
    .context("failed to load the basemap")?;

    let layout = compute_map_layout(&resolved, &basemap, config);
    info!(
        labels = layout.labels.len(),
        iterations = layout.placement.iterations,
        status = ?layout.placement.status,
        "labels placed"
    );
    if let Some(path) = dump_layout {
        write_layout_dump(path, &layout)?;
        info!(path = %path.display(), "layout dump written");
    }

    let svg = render_svg(&layout, &config.theme);
    let output = config.render.output.as_path();
    match output_format(format, output) {
        OutputFormat::Svg => write_output_svg(&svg, output)?,
        OutputFormat::Png => write_output_png(&svg, output, &config.render)?,
    }
    info!(path = %output.display(), "map saved");
    Ok(())
}
