use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{info, LevelFilter};

use scanmark_algorithms::{propose_boxes, ClusterParams, Normalizer};
use scanmark_core::{Annotation, AnnotationStore, BBox2D, Drawable, View};
use scanmark_io::annotation::{read_document, write_annotations};
use scanmark_io::{result_file_name, FrameFiles, HeaderParser, PcdDecoder};

#[derive(Parser, Debug)]
#[command(
    name = "scanmark",
    about = "Inspect point-cloud scans and 3D box annotations",
    version
)]
struct Cli {
    /// Log at debug level (RUST_LOG still takes precedence per module)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the header, extent and render normalization of a PCD scan
    Inspect {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Cluster a scan and write the proposed boxes as an annotation document
    Propose {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Neighbourhood radius in scan units
        #[arg(long, default_value_t = 0.5)]
        eps: f32,

        /// Neighbours needed for a core point
        #[arg(long, default_value_t = 10)]
        min_samples: usize,

        /// Class assigned to every proposal
        #[arg(long, default_value = "object")]
        class: String,

        #[arg(long, default_value_t = 0)]
        frame_id: i64,

        #[arg(long, default_value = "")]
        tracking_id: String,

        /// Output path, defaults to result_{frame_id}.json
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Validate an annotation document and list its boxes
    Check {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Print the world-space edit handles of one box for a view
    Handles {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[arg(long)]
        id: u64,

        /// top, front, side or perspective
        #[arg(long, default_value = "perspective")]
        view: View,
    },
    /// Load a frame folder: its scan, image and annotations.json
    Frame {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    match cli.command {
        Command::Inspect { input } => inspect(&input),
        Command::Propose {
            input,
            eps,
            min_samples,
            class,
            frame_id,
            tracking_id,
            output,
        } => {
            let params = ClusterParams { eps, min_samples };
            let output = output.unwrap_or_else(|| PathBuf::from(result_file_name(frame_id)));
            propose(&input, &params, &class, frame_id, &tracking_id, &output)
        }
        Command::Check { input } => check(&input),
        Command::Handles { input, id, view } => handles(&input, id, view),
        Command::Frame { dir } => frame(&dir),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn inspect(path: &Path) -> Result<()> {
    let bytes = read_bytes(path)?;
    let header = HeaderParser::parse(&bytes)
        .with_context(|| format!("failed to parse PCD header of {}", path.display()))?;
    let cloud = PcdDecoder::decode_with_header(&bytes, &header, file_name(path))
        .with_context(|| format!("failed to decode {}", path.display()))?;

    println!("file:     {}", path.display());
    println!("fields:   {}", header.field_names().join(" "));
    println!("points:   {}", header.points);
    match header.stride() {
        Some(stride) => println!("stride:   {} bytes", stride),
        None => println!("stride:   overflows"),
    }
    println!("payload:  offset {}", header.payload_offset);

    match cloud.bounding_box() {
        Some(extent) => {
            let size = extent.size();
            println!(
                "extent:   min ({}, {}, {}) max ({}, {}, {})",
                extent.min.x, extent.min.y, extent.min.z, extent.max.x, extent.max.y, extent.max.z
            );
            println!("size:     {} x {} x {}", size.x, size.y, size.z);
        }
        None => println!("extent:   empty"),
    }

    let normalized = Normalizer::default().normalize(&cloud);
    println!(
        "render:   {} of {} points kept, center ({}, {}, {}), scale {}",
        normalized.len(),
        cloud.len(),
        normalized.center.x,
        normalized.center.y,
        normalized.center.z,
        normalized.scale
    );
    Ok(())
}

fn propose(
    path: &Path,
    params: &ClusterParams,
    class: &str,
    frame_id: i64,
    tracking_id: &str,
    output: &Path,
) -> Result<()> {
    if class.trim().is_empty() {
        bail!("--class must not be empty");
    }

    let bytes = read_bytes(path)?;
    let cloud = PcdDecoder::decode(&bytes, file_name(path))
        .with_context(|| format!("failed to decode {}", path.display()))?;
    let boxes = propose_boxes(&cloud, params).context("clustering failed")?;

    let mut store = AnnotationStore::new();
    for (idx, bbox) in boxes.into_iter().enumerate() {
        let annotation = Annotation::new(idx as u64 + 1, class, BBox2D::default(), bbox)
            .with_tracking_id(tracking_id);
        store.add(annotation);
    }

    write_annotations(output, frame_id, tracking_id, store.annotations())
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {} proposals to {}", store.len(), output.display());
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let bytes = read_bytes(path)?;
    let document = read_document(&bytes).with_context(|| format!("{} is not a valid annotation document", path.display()))?;

    if let Some(frame_id) = document.frame_id {
        println!("frame_id:    {}", frame_id);
    }
    if let Some(tracking_id) = &document.tracking_id {
        println!("tracking_id: {}", tracking_id);
    }
    println!("annotations: {}", document.annotations.len());
    for annotation in &document.annotations {
        let b = &annotation.bbox_3d;
        println!(
            "  #{} {:<12} center ({:.3}, {:.3}, {:.3}) dims ({:.3}, {:.3}, {:.3}) yaw {:.3}",
            annotation.id,
            annotation.class,
            b.center.x,
            b.center.y,
            b.center.z,
            b.width(),
            b.height(),
            b.depth(),
            b.yaw()
        );
    }
    Ok(())
}

fn handles(path: &Path, id: u64, view: View) -> Result<()> {
    let bytes = read_bytes(path)?;
    let annotations = read_document(&bytes)
        .with_context(|| format!("{} is not a valid annotation document", path.display()))?
        .annotations;
    let store = AnnotationStore::from_annotations(annotations);
    let Some(annotation) = store.get(id) else {
        bail!("no annotation with id {} in {}", id, path.display());
    };

    println!("{} handles for #{} ({})", view, id, annotation.class);
    for p in annotation.bbox_3d.world_handles(view) {
        println!("  ({:.4}, {:.4}, {:.4})", p.x, p.y, p.z);
    }
    Ok(())
}

fn frame(dir: &Path) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    let files = FrameFiles::classify(&entries);
    if files.point_cloud.is_none() {
        bail!("no .pcd file in {}", dir.display());
    }
    let loaded = files
        .load()
        .with_context(|| format!("failed to load frame {}", dir.display()))?;

    println!("frame:       {}", files.folder_name().unwrap_or_default());
    println!(
        "points:      {}",
        loaded.point_cloud.as_ref().map_or(0, |cloud| cloud.len())
    );
    match &loaded.image {
        Some(image) => println!("image:       {}", image.display()),
        None => println!("image:       none"),
    }
    println!("annotations: {}", loaded.annotations.len());
    Ok(())
}
