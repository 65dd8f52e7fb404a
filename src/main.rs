//! Command line front end: load GeoJSON files, restyle them and export.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::info;

use geostyle::{
    Configurable, HexColor, SnapshotSurface, StylePatch, Viewer, ViewerError, ViewerProfile,
};

/// style GeoJSON layers and export them as GeoJSON or PNG
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write every feature, with its style, into one FeatureCollection
    Export {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// output file; stdout when neither this nor --name is given
        #[arg(long)]
        out: Option<PathBuf>,

        /// export file stem, written to the current directory
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// rasterize the loaded layers to a PNG image
    Render {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// print each layer's name and effective style
    List {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,
    },
}

/// style overrides applied to every loaded layer
#[derive(Args, Debug)]
struct StyleArgs {
    /// stroke color, e.g. #3388ff
    #[arg(long)]
    color: Option<HexColor>,

    /// stroke width in pixels
    #[arg(long)]
    weight: Option<u32>,

    #[arg(long)]
    fill_color: Option<HexColor>,

    /// fill opacity between 0 and 1
    #[arg(long)]
    fill_opacity: Option<f64>,

    /// point marker radius in pixels
    #[arg(long)]
    radius: Option<u32>,

    /// viewer profile JSON to start from
    #[arg(long)]
    profile: Option<PathBuf>,
}

impl StyleArgs {
    fn patch(&self) -> StylePatch {
        StylePatch {
            stroke_color: self.color,
            stroke_weight: self.weight,
            fill_color: self.fill_color,
            fill_opacity: self.fill_opacity,
            point_radius: self.radius,
        }
    }

    fn viewer(&self) -> Result<Viewer<SnapshotSurface>, ViewerError> {
        let mut viewer = Viewer::new(SnapshotSurface::new());
        if let Some(path) = &self.profile {
            let json = read(path)?;
            viewer.apply_profile(&ViewerProfile::from_json(&json)?);
        }
        Ok(viewer)
    }
}

fn read(path: &Path) -> Result<String, ViewerError> {
    std::fs::read_to_string(path).map_err(|source| ViewerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), ViewerError> {
    std::fs::write(path, contents).map_err(|source| ViewerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Loads every file, then applies the style flags.
///
/// Returns the first load failure so the process can exit non-zero after
/// the remaining files were still handled.
fn load(
    viewer: &mut Viewer<SnapshotSurface>,
    files: &[PathBuf],
    style: &StyleArgs,
) -> Result<Option<ViewerError>, ViewerError> {
    let first_failure = viewer.load_files(files).into_iter().find_map(Result::err);

    let patch = style.patch();
    if !patch.is_empty() {
        viewer.update_all_styles(&patch)?;
    }
    Ok(first_failure)
}

fn run(cli: Cli) -> Result<(), ViewerError> {
    let failure = match cli.command {
        Command::Export {
            files,
            out,
            name,
            style,
        } => {
            let mut viewer = style.viewer()?;
            let failure = load(&mut viewer, &files, &style)?;

            if let Some(name) = &name {
                let profile = viewer.export_profile().with_export_name(name.as_str());
                viewer.apply_profile(&profile);
            }
            let export = viewer.export_geojson()?;

            match (out, name) {
                (Some(path), _) => write(&path, &export.content)?,
                (None, Some(_)) => write(Path::new(&export.file_name), &export.content)?,
                (None, None) => println!("{}", export.content),
            }
            failure
        }
        Command::Render {
            files,
            out,
            width,
            height,
            style,
        } => {
            let mut viewer = style.viewer()?;
            let failure = load(&mut viewer, &files, &style)?;

            let snapshot = viewer.export_profile().snapshot;
            let png = viewer.export_image(
                width.unwrap_or(snapshot.width),
                height.unwrap_or(snapshot.height),
            )?;
            write(&out, png)?;
            failure
        }
        Command::List { files, style } => {
            let mut viewer = style.viewer()?;
            let failure = load(&mut viewer, &files, &style)?;

            for (index, layer) in viewer.registry().iter().enumerate() {
                println!("{index:>3}  {}  ({})", layer.name(), layer.style());
            }
            failure
        }
    };

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn main() -> Result<(), ViewerError> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    run(Cli::parse())
}
