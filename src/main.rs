use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use ndarray::IxDyn;

use skyslicer::camera::{CameraModel, FocalPlane};
use skyslicer::footprint::ChipSelection;
use skyslicer::healpix::HealpixGrid;
use skyslicer::maps::{GalacticCoordsMap, SkyMap};
use skyslicer::metrics::{CountMetric, MeanMetric, Metric, run_metric};
use skyslicer::slice_points::SlicePoints;
use skyslicer::slicer::{SlicerConfig, SpatialSlicer};
use skyslicer::table::ObservationTable;

#[derive(Parser)]
#[command(name = "skyslicer", about = "Slice survey pointings onto a HEALPix sky grid")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Number of observations covering each slice point.
    Count {
        #[command(flatten)]
        slice: SliceArgs,
    },

    /// Mean of a numeric column over the observations covering each slice point.
    Mean {
        /// Column to average.
        column: String,

        #[command(flatten)]
        slice: SliceArgs,
    },
}

#[derive(Args)]
struct SliceArgs {
    /// Observation table (CSV with a header row).
    observations: PathBuf,

    /// HEALPix depth of the slice grid (nside = 2^depth).
    #[arg(long, default_value = "4")]
    depth: u8,

    /// Field-of-view radius in degrees.
    #[arg(long, default_value = "1.75")]
    radius: f64,

    /// Longitude column.
    #[arg(long, default_value = "fieldRA")]
    lon_col: String,

    /// Latitude column.
    #[arg(long, default_value = "fieldDec")]
    lat_col: String,

    /// Angle columns are in radians rather than degrees.
    #[arg(long)]
    radians: bool,

    /// Match through the LSST-like focal plane instead of the plain radius.
    #[arg(long)]
    footprint: bool,

    /// Restrict footprint matches to these chips. Can be repeated.
    #[arg(long = "chip")]
    chips: Vec<String>,

    /// Maximum points per KD-tree leaf.
    #[arg(long, default_value = "100")]
    leaf_size: usize,

    /// Value reported for slice points with no observations.
    #[arg(long, default_value = "-666", allow_hyphen_values = true)]
    badval: f64,

    /// Add galactic coordinates to the output.
    #[arg(long)]
    galactic: bool,
}

impl SliceArgs {
    fn config(&self) -> SlicerConfig {
        let chip_names = if self.chips.is_empty() {
            ChipSelection::All
        } else {
            ChipSelection::only(self.chips.iter().cloned())
        };
        SlicerConfig {
            lon_col: self.lon_col.clone(),
            lat_col: self.lat_col.clone(),
            radius: self.radius,
            lat_lon_deg: !self.radians,
            use_camera: self.footprint,
            chip_names,
            leaf_size: self.leaf_size,
            badval: self.badval,
            ..SlicerConfig::default()
        }
    }
}

fn cmd_slice(args: &SliceArgs, metric: &dyn Metric) -> Result<()> {
    let start = Instant::now();
    let obs = ObservationTable::from_csv_path(&args.observations)
        .with_context(|| format!("failed to load {}", args.observations.display()))?;
    info!("loaded {} observations from {}", obs.len(), args.observations.display());

    let grid = HealpixGrid::new(args.depth)?;
    let mut slicer = SpatialSlicer::new(args.config(), SlicePoints::healpix(grid))?;
    info!(
        "slicing onto {} HEALPix points (nside {}, ~{:.3} deg)",
        grid.npix(),
        grid.nside(),
        grid.resolution_deg()
    );

    let focal_plane = FocalPlane::lsst_like();
    let camera = args.footprint.then_some(&focal_plane as &dyn CameraModel);
    let galactic = GalacticCoordsMap;
    let maps: Vec<&dyn SkyMap> = if args.galactic { vec![&galactic as &dyn SkyMap] } else { Vec::new() };
    slicer
        .setup_slicer(&obs, &maps, camera)
        .context("slicer setup failed")?;

    let values = run_metric(&slicer, &obs, metric)?;
    info!("{} computed in {:.2?}", metric.name(), start.elapsed());

    let points = slicer.slice_points();
    let gal = args
        .galactic
        .then(|| Some((points.get("gall")?.as_array()?, points.get("galb")?.as_array()?)))
        .flatten();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if gal.is_some() {
        writeln!(out, "sid,ra_deg,dec_deg,gall_deg,galb_deg,value")?;
    } else {
        writeln!(out, "sid,ra_deg,dec_deg,value")?;
    }
    for (sid, value) in values.iter().enumerate() {
        let ra = points.ra()[sid].to_degrees();
        let dec = points.dec()[sid].to_degrees();
        match gal {
            Some((l, b)) => writeln!(
                out,
                "{sid},{ra:.6},{dec:.6},{:.6},{:.6},{value}",
                l[IxDyn(&[sid])].to_degrees(),
                b[IxDyn(&[sid])].to_degrees()
            )?,
            None => writeln!(out, "{sid},{ra:.6},{dec:.6},{value}")?,
        }
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Count { slice } => cmd_slice(slice, &CountMetric),
        Commands::Mean { column, slice } => cmd_slice(slice, &MeanMetric::new(column)),
    }
}
