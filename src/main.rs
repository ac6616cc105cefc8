use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use collectai::capture::{CaptureSession, FrameSource, ReleaseOutcome};
use collectai::classes::ClassRegistry;
use collectai::config::AppConfig;
use collectai::editor::EditingSession;
use collectai::model::{PixelRect, Point};
use collectai::notice::Notice;
use collectai::tools;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[clap(name = "collectai", version, about = "Object-detection dataset capture and editing")]
struct Opts {
    /// configuration file (defaults to the platform config directory)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List every image of a dataset with its boxes
    Inspect {
        /// dataset folder
        folder: PathBuf,
    },
    /// Manage the class mapping file
    Classes {
        #[clap(subcommand)]
        action: ClassesAction,
    },
    /// Replace class tokens in label files
    Remap {
        /// label directories
        #[clap(required = true)]
        dirs: Vec<PathBuf>,
        /// FROM=TO replacement, repeatable
        #[clap(long = "map", required = true, parse(try_from_str = parse_mapping))]
        map: Vec<(String, String)>,
    },
    /// Merge a secondary capture tree after a primary one
    Merge {
        primary: PathBuf,
        secondary: PathBuf,
        target: PathBuf,
    },
    /// Replay a capture session against a still frame
    Capture {
        /// frame image standing in for the screen
        #[clap(long)]
        frame: PathBuf,
        /// target region X1,Y1,X2,Y2
        #[clap(long, parse(try_from_str = parse_rect))]
        target: PixelRect,
        /// class (and crop folder) for the boxes
        #[clap(long)]
        class: String,
        /// box to annotate X1,Y1,X2,Y2, repeatable
        #[clap(long = "box", parse(try_from_str = parse_rect))]
        boxes: Vec<PixelRect>,
        /// output root, overrides the configuration
        #[clap(long)]
        dataset_root: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum ClassesAction {
    List,
    Add { id: String, name: String },
    Edit { id: String, name: String },
    Delete { id: String },
    /// Replace the mapping with the one in a file
    Import { file: PathBuf },
    Export { file: PathBuf },
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let config_path = opts.config.clone().or_else(AppConfig::default_path);
    let config = match &config_path {
        Some(path) if opts.config.is_some() => AppConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        Some(path) => AppConfig::load_or_default(path),
        None => AppConfig::default(),
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();
    log::debug!("Configuration path: {:?}", config_path);

    match opts.command {
        Command::Inspect { folder } => inspect(&config, &folder)?,
        Command::Classes { action } => classes(&config, action)?,
        Command::Remap { dirs, map } => remap(&dirs, map)?,
        Command::Merge {
            primary,
            secondary,
            target,
        } => merge(&primary, &secondary, &target)?,
        Command::Capture {
            frame,
            target,
            class,
            boxes,
            dataset_root,
        } => capture(&config, &frame, target, &class, &boxes, dataset_root)?,
    }

    Ok(())
}

fn inspect(config: &AppConfig, folder: &Path) -> Result<()> {
    let (registry, notice) = ClassRegistry::open(&config.editor.class_mapping_file);
    report(notice);

    let mut session = EditingSession::new(config.editor.clone());
    if let Err(e) = session.open_dataset(folder) {
        if session.dataset().is_none() {
            return Err(e).with_context(|| format!("failed to open dataset {}", folder.display()));
        }
    }
    let images = session
        .dataset()
        .map(|d| d.images.clone())
        .unwrap_or_default();

    for path in &images {
        if let Err(e) = session.load_image(path) {
            println!("{}: {}", path.display(), e);
            continue;
        }
        let (index, total) = session.position().unwrap_or((0, images.len()));
        let (width, height) = session.image_size().unwrap_or((0, 0));
        println!(
            "[{}/{}] {} ({}x{}, {} box(es))",
            index + 1,
            total,
            path.display(),
            width,
            height,
            session.annotations().len()
        );
        for (overlay, bbox) in session.overlays(&registry).iter().zip(session.annotations()) {
            let [r, g, b] = overlay.color;
            println!(
                "  #{} {} ({}) {:.6} {:.6} {:.6} {:.6} #{:02x}{:02x}{:02x}",
                overlay.index,
                overlay.label,
                bbox.class_id,
                bbox.x_center,
                bbox.y_center,
                bbox.width,
                bbox.height,
                r,
                g,
                b
            );
        }
    }

    Ok(())
}

fn classes(config: &AppConfig, action: ClassesAction) -> Result<()> {
    let (mut registry, notice) = ClassRegistry::open(&config.editor.class_mapping_file);
    report(notice);

    let notice = match action {
        ClassesAction::List => {
            for (id, name) in registry.entries() {
                println!("{}\t{}", id, name);
            }
            None
        }
        ClassesAction::Add { id, name } => registry.add(&id, &name)?,
        ClassesAction::Edit { id, name } => registry.edit(&id, &name)?,
        ClassesAction::Delete { id } => registry.delete(&id)?,
        ClassesAction::Import { file } => registry.import(&file)?,
        ClassesAction::Export { file } => {
            registry.export(&file)?;
            None
        }
    };
    report(notice);

    Ok(())
}

fn remap(dirs: &[PathBuf], map: Vec<(String, String)>) -> Result<()> {
    let map: HashMap<String, String> = map.into_iter().collect();
    for dir in dirs {
        match tools::remap_labels(dir, &map) {
            Ok(summary) => println!(
                "{}: {} line(s) remapped in {} file(s)",
                dir.display(),
                summary.lines_remapped,
                summary.files_rewritten
            ),
            Err(tools::ToolError::MissingDirectory(_)) => {
                println!("{}: not found, skipped", dir.display())
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn merge(primary: &Path, secondary: &Path, target: &Path) -> Result<()> {
    let summary = tools::merge_trees(primary, secondary, target)
        .with_context(|| format!("failed to merge into {}", target.display()))?;
    for notice in &summary.skipped {
        println!("{}", notice);
    }
    println!(
        "{} copied, {} renumbered, {} skipped",
        summary.copied,
        summary.renumbered,
        summary.skipped.len()
    );
    Ok(())
}

fn capture(
    config: &AppConfig,
    frame: &Path,
    target: PixelRect,
    class: &str,
    boxes: &[PixelRect],
    dataset_root: Option<PathBuf>,
) -> Result<()> {
    let mut capture_config = config.capture.clone();
    if let Some(root) = dataset_root {
        capture_config.dataset_root = root;
    }

    let source = FrameSource::open(frame)?;
    let mut session = CaptureSession::new(source, capture_config);

    session.enter_target_selection();
    let outcome = drag(&mut session, target)?;
    if !matches!(outcome, ReleaseOutcome::TargetCandidate(_)) {
        bail!("target region {} is too small", target);
    }
    let active = session.confirm_target()?;
    println!("target: {}", active.image_path.display());

    if session.set_active_class(class)? {
        println!("whitespace in class name replaced with underscores");
    }

    for rect in boxes {
        match drag(&mut session, *rect) {
            Ok(ReleaseOutcome::Annotated(committed)) => {
                println!("{} -> {}", rect, committed.crop_path.display())
            }
            Ok(_) => println!("{}: too small, discarded", rect),
            Err(e) => println!("{}: {}", rect, e),
        }
    }

    match std::fs::read_to_string(&active.label_path) {
        Ok(labels) => print!("{}", labels),
        Err(_) => println!("no annotations written"),
    }
    Ok(())
}

fn drag(
    session: &mut CaptureSession<FrameSource>,
    rect: PixelRect,
) -> Result<ReleaseOutcome, collectai::capture::CaptureError> {
    session.press(Point::new(f64::from(rect.x1), f64::from(rect.y1)));
    let end = Point::new(f64::from(rect.x2), f64::from(rect.y2));
    session.drag_to(end);
    session.release(end)
}

fn report(notice: Option<Notice>) {
    if let Some(notice) = notice {
        eprintln!("{}", notice);
    }
}

fn parse_rect(text: &str) -> Result<PixelRect, String> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid rectangle '{}': {}", text, e))?;
    match values[..] {
        [x1, y1, x2, y2] => Ok(PixelRect::new(x1, y1, x2, y2)),
        _ => Err(format!("expected X1,Y1,X2,Y2, got '{}'", text)),
    }
}

fn parse_mapping(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim().to_string(), to.trim().to_string()))
        }
        _ => Err(format!("expected FROM=TO, got '{}'", text)),
    }
}
