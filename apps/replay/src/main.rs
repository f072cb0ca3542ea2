use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;

use homebuilder_collide::{CollisionChecker, Placement, WallPair};
use homebuilder_core::geometry::Point;
use homebuilder_core::{LevelId, WallSummary, World};
use homebuilder_io::{Journal, JournalReader, JournalWriter};

#[derive(Parser, Debug)]
#[command(name = "homebuilder-replay", about = "Replay a HomeBuilder journal and report its walls")]
struct Cli {
    /// Journal file to replay.
    journal: PathBuf,

    /// Undo this many transactions after replaying.
    #[arg(long, default_value_t = 0)]
    undo: usize,

    /// Report colliding wall pairs on every level.
    #[arg(long)]
    collisions: bool,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Write the replayed history to a new journal.
    #[arg(long, value_name = "PATH")]
    rewrite: Option<PathBuf>,

    /// Check whether a wall of the default width could be drawn between
    /// two floor points.
    #[arg(long, value_name = "X1,Z1,X2,Z2", value_parser = parse_segment)]
    check: Option<Segment>,

    /// Level for `--check`; defaults to the active level.
    #[arg(long, value_name = "ID")]
    level: Option<u64>,

    /// Override the journal's shortest accepted wall length for `--check`.
    #[arg(long)]
    min_wall_length: Option<f64>,

    /// Override the journal's editable extent for `--check`.
    #[arg(long)]
    max_extent: Option<f64>,
}

/// A wall centerline given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Segment {
    start: Point,
    end: Point,
}

fn parse_segment(arg: &str) -> Result<Segment, String> {
    let values = arg
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|err| format!("{}: {}", part.trim(), err)))
        .collect::<Result<Vec<f64>, String>>()?;
    let &[x1, z1, x2, z2] = values.as_slice() else {
        return Err(format!("expected four comma separated numbers, got {}", values.len()));
    };
    Ok(Segment {
        start: Point::new(x1, 0.0, z1),
        end: Point::new(x2, 0.0, z2),
    })
}

#[derive(Serialize)]
struct PlacementReport {
    level: LevelId,
    segment: Segment,
    width: f64,
    verdict: Placement,
}

#[derive(Serialize)]
struct LevelReport {
    id: LevelId,
    y: f64,
    walls: Vec<WallSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collisions: Option<Vec<WallPair>>,
}

#[derive(Serialize)]
struct Report {
    name: String,
    transactions: usize,
    levels: Vec<LevelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    placement: Option<PlacementReport>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let file = File::open(&cli.journal).with_context(|| format!("opening {}", cli.journal.display()))?;
    let mut journal = JournalReader::new(BufReader::new(file))
        .read()
        .with_context(|| format!("reading {}", cli.journal.display()))?;
    if let Some(length) = cli.min_wall_length {
        journal.meta.settings.min_wall_length = length;
    }
    if let Some(extent) = cli.max_extent {
        journal.meta.settings.max_extent = extent;
    }

    let mut world = journal.replay()?;
    for step in 0..cli.undo {
        if !world.can_undo() {
            bail!("only {} of {} transactions could be undone", step, cli.undo);
        }
        world.undo()?;
    }
    world.flush();

    let mut report = build_report(&world, cli.collisions)?;
    if let Some(segment) = cli.check {
        let level = cli.level.map_or(world.active_level(), LevelId::from_raw);
        report.placement = Some(check_placement(&world, level, segment)?);
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = &cli.rewrite {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        JournalWriter::new(BufWriter::new(file))
            .pretty(true)
            .write(&Journal::from_world(&world))?;
        log::info!("rewrote journal to {}", path.display());
    }
    Ok(())
}

fn build_report(world: &World, collisions: bool) -> Result<Report> {
    let summaries = world.summaries();
    let mut levels = Vec::new();
    for level in world.plan().levels() {
        let collisions = if collisions {
            let checker = CollisionChecker::new(world.plan(), level.id())?.with_settings(world.settings());
            Some(checker.all_collisions())
        } else {
            None
        };
        levels.push(LevelReport {
            id: level.id(),
            y: level.y(),
            walls: summaries.iter().filter(|s| s.level == level.id()).cloned().collect(),
            collisions,
        });
    }
    Ok(Report {
        name: world.name.clone(),
        transactions: world.history().len(),
        levels,
        placement: None,
    })
}

fn check_placement(world: &World, level: LevelId, segment: Segment) -> Result<PlacementReport> {
    let y = world
        .plan()
        .level(level)
        .with_context(|| format!("no level {}", level))?
        .y();
    let segment = Segment {
        start: segment.start.with_y(y),
        end: segment.end.with_y(y),
    };
    let width = world.settings().wall_width;
    let checker = CollisionChecker::new(world.plan(), level)?.with_settings(world.settings());
    let verdict = checker.check_placement(segment.start, segment.end, width)?;
    Ok(PlacementReport {
        level,
        segment,
        width,
        verdict,
    })
}

fn print_report(report: &Report) {
    println!("{}: {} transactions", report.name, report.transactions);
    for level in &report.levels {
        println!("level {} at y = {:.3} ({} walls)", level.id, level.y, level.walls.len());
        for wall in &level.walls {
            println!(
                "  wall {}  ({:.3}, {:.3}) -> ({:.3}, {:.3})  angle {:>3}  width {:.3}  height {:.3}",
                wall.id, wall.start.x, wall.start.z, wall.end.x, wall.end.z, wall.angle, wall.width, wall.height
            );
        }
        let Some(collisions) = &level.collisions else {
            continue;
        };
        if collisions.is_empty() {
            println!("  no collisions");
        }
        for pair in collisions {
            let [min_x, min_z, max_x, max_z] = pair.collision.bbox;
            println!(
                "  collision {} x {}  [{:.3}, {:.3}] - [{:.3}, {:.3}]",
                pair.first, pair.collision.wall, min_x, min_z, max_x, max_z
            );
        }
    }
    if let Some(placement) = &report.placement {
        let (start, end) = (placement.segment.start, placement.segment.end);
        let verdict = match &placement.verdict {
            Placement::Valid => "valid".to_string(),
            Placement::TooShort { length } => format!("too short ({:.3})", length),
            Placement::OutOfBounds => "out of bounds".to_string(),
            Placement::Collides(collisions) => {
                let walls: Vec<String> = collisions.iter().map(|c| c.wall.to_string()).collect();
                format!("collides with {}", walls.join(", "))
            }
        };
        println!(
            "placement on {} ({:.3}, {:.3}) -> ({:.3}, {:.3}) width {:.3}: {}",
            placement.level, start.x, start.z, end.x, end.z, placement.width, verdict
        );
    }
}
