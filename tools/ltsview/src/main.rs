use std::fs::File;
use std::io::stdout;
use std::io::BufWriter;
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use anyhow::anyhow;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::ValueEnum;
use log::info;

use mcrl2rust_io::io_aut::read_aut;
use mcrl2rust_io::io_aut::write_aut;
use mcrl2rust_ltsview::ClusterIndex;
use mcrl2rust_ltsview::ClusterStyle;
use mcrl2rust_ltsview::ForceDirected;
use mcrl2rust_ltsview::LayoutConfig;
use mcrl2rust_ltsview::LtsView;
use mcrl2rust_ltsview::RankStyle;
use mcrl2rust_utilities::Timing;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RankArg {
    Iterative,
    Cyclic,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ClusterArg {
    Weighted,
    Uniform,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Summary,
    Layout,
}

#[derive(clap::Parser, Debug)]
#[command(name = "Maurice Laveaux", about = "Computes the clustered 3D layout of a labelled transition system")]
struct Cli {
    filename: String,

    #[arg(long, value_enum, default_value = "iterative")]
    rank_style: RankArg,

    #[arg(long, value_enum, default_value = "weighted")]
    cluster_style: ClusterArg,

    /// Performs the given number of force directed steps after the single pass layout.
    #[arg(long)]
    force_steps: Option<usize>,

    /// Zooms into the subtree below the cluster given as "rank,position".
    #[arg(long, value_parser = parse_cluster_index, conflicts_with = "zoom_above")]
    zoom_below: Option<ClusterIndex>,

    /// Zooms into the path from the root to the cluster given as "rank,position".
    #[arg(long, value_parser = parse_cluster_index)]
    zoom_above: Option<ClusterIndex>,

    #[arg(long, value_enum, default_value = "summary")]
    output: Output,

    /// Writes the (zoomed) labelled transition system to the given .aut file.
    #[arg(long)]
    write: Option<String>,

    #[arg(short, long)]
    tau: Option<Vec<String>>,

    #[arg(long)]
    time: bool,
}

fn parse_cluster_index(value: &str) -> Result<ClusterIndex, String> {
    let (rank, position) = value
        .split_once(',')
        .ok_or_else(|| format!("Expected \"rank,position\" but got \"{value}\""))?;

    let rank = rank.trim().parse().map_err(|err| format!("Invalid rank: {err}"))?;
    let position = position.trim().parse().map_err(|err| format!("Invalid position: {err}"))?;
    Ok(ClusterIndex::new(rank, position))
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();

    let config = LayoutConfig {
        rank_style: match cli.rank_style {
            RankArg::Iterative => RankStyle::Iterative,
            RankArg::Cyclic => RankStyle::Cyclic,
        },
        cluster_style: match cli.cluster_style {
            ClusterArg::Weighted => ClusterStyle::Weighted,
            ClusterArg::Uniform => ClusterStyle::Uniform,
        },
        multi_pass: cli.force_steps.is_some(),
        ..Default::default()
    };

    let mut timing = Timing::new();

    let file = File::open(&cli.filename).with_context(|| format!("Cannot open {}", cli.filename))?;
    let mut load_time = timing.start("load");
    let lts = read_aut(&file, cli.tau.unwrap_or_default()).map_err(|err| anyhow!("{err}"))?;
    load_time.finish();

    let mut view = LtsView::new(lts)?;
    let mut layout_time = timing.start("layout");
    view.run_pipeline(&config)?;
    layout_time.finish();

    if let Some(target) = cli.zoom_below {
        let mut time = timing.start("zoom");
        view.zoom_into_below(target)?;
        time.finish();
    } else if let Some(target) = cli.zoom_above {
        let mut time = timing.start("zoom");
        view.zoom_into_above(target)?;
        time.finish();
    }

    if let Some(steps) = cli.force_steps {
        let mut time = timing.start("force-directed");
        let stop = AtomicBool::new(false);
        let mut layout = ForceDirected::new(&view, &config.force)?;
        layout.run(&mut view, &stop, Some(steps));
        time.finish();
    }

    info!("Layout has {} clusters in {} ranks", view.num_clusters(), view.num_ranks());

    let mut writer = BufWriter::new(stdout());
    match cli.output {
        Output::Summary => writeln!(writer, "{view}")?,
        Output::Layout => print_layout(&mut writer, &view)?,
    }
    writer.flush()?;

    if let Some(path) = cli.write {
        let mut writer = BufWriter::new(File::create(&path).with_context(|| format!("Cannot create {path}"))?);
        write_aut(&mut writer, view.lts()).map_err(|err| anyhow!("{err}"))?;
    }

    if cli.time {
        timing.print();
    }

    Ok(ExitCode::SUCCESS)
}

/// Prints every cluster followed by the positions of its states.
fn print_layout(writer: &mut impl Write, view: &LtsView) -> Result<()> {
    for cluster in view.clusters() {
        let centre = cluster.position_abs();
        writeln!(
            writer,
            "cluster {} states {} position {:.3} top {:.3} base {:.3} bc ({:.3}, {:.3}) centre ({:.3}, {:.3}, {:.3})",
            cluster.index(),
            cluster.num_states(),
            cluster.position(),
            cluster.top_radius(),
            cluster.base_radius(),
            cluster.bc_radius(),
            cluster.bc_height(),
            centre.x,
            centre.y,
            centre.z
        )?;

        for index in cluster.states() {
            let state = view.state(*index);
            let position = state.position_abs();
            writeln!(
                writer,
                "  state {} angle {:.3} radius {:.3} absolute ({:.3}, {:.3}, {:.3})",
                state.original_id(),
                state.position_angle(),
                state.position_radius(),
                position.x,
                position.y,
                position.z
            )?;
        }
    }

    Ok(())
}
