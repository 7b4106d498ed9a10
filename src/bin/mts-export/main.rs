//! mts-export CLI - export JSON scene descriptions and inspect mesh archives.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use mts_export::prelude::*;
use mts_export::export::parse_resolution;
use mts_export::util::{BBox3f, Vec3};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "warn",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return Ok(());
    }

    match filtered_args[0] {
        "export" | "e" => {
            let Some(input) = filtered_args.get(1) else {
                eprintln!("Error: missing scene argument");
                eprintln!("Usage: mts-export export <scene.json> [OPTIONS]");
                std::process::exit(1);
            };
            let options = ExportOptions::parse(&filtered_args[2..])?;
            cmd_export(Path::new(input), options)
        }

        "inspect" | "i" => {
            let Some(input) = filtered_args.get(1) else {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: mts-export inspect <file.serialized>");
                std::process::exit(1);
            };
            cmd_inspect(Path::new(input))
        }

        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        // Passing an archive directly is the same as 'inspect'
        path if path.ends_with(".serialized") => cmd_inspect(Path::new(path)),

        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }
}

/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mts_export={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_help() {
    println!("mts-export - Mitsuba scene exporter");
    println!();
    println!("USAGE:");
    println!("    mts-export [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    e, export  <scene.json> [EXPORT OPTIONS]   Write a scene document and its geometry");
    println!("    i, inspect <file.serialized>               List the meshes in an archive");
    println!("    h, help                                    Show this help");
    println!();
    println!("EXPORT OPTIONS:");
    println!("    -o, --output <dir>         Output directory (default: next to the input)");
    println!("    -n, --name <file.xml>      Scene document name (default: <input stem>.xml)");
    println!("    -s, --settings <file>      Settings file (default: user config directory)");
    println!("    --integrator <name|index>  direct, path, ptracer, bdpt, pssmlt, mlt, erpt");
    println!("    --resolution <WxH>         Film resolution");
    println!("    --samples <n>              Samples per pixel");
    println!("    --path-length <n>          Maximum path depth");
    println!("    --obj                      Write one OBJ file per mesh instead of an archive");
    println!("    --save-settings            Store the resulting settings as the new defaults");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Only show warnings and errors");
    println!();
    println!("EXAMPLES:");
    println!("    mts-export export room.json                       # room.xml + room.serialized");
    println!("    mts-export export room.json --integrator path     # Path tracer");
    println!("    mts-export export room.json -o out --obj          # OBJ geometry in out/");
    println!("    mts-export inspect room.serialized                # Mesh listing");
}

#[derive(Default)]
struct ExportOptions {
    output: Option<PathBuf>,
    name: Option<String>,
    settings: Option<PathBuf>,
    integrator: Option<String>,
    resolution: Option<(u32, u32)>,
    samples: Option<u32>,
    path_length: Option<u32>,
    obj: bool,
    save_settings: bool,
}

impl ExportOptions {
    fn parse(args: &[&str]) -> Result<Self> {
        let mut options = Self::default();
        let mut iter = args.iter();
        while let Some(&arg) = iter.next() {
            let mut value = || {
                iter.next()
                    .copied()
                    .with_context(|| format!("missing value for {}", arg))
            };
            match arg {
                "-o" | "--output" => options.output = Some(PathBuf::from(value()?)),
                "-n" | "--name" => options.name = Some(value()?.to_string()),
                "-s" | "--settings" => options.settings = Some(PathBuf::from(value()?)),
                "--integrator" => options.integrator = Some(value()?.to_string()),
                "--resolution" => options.resolution = Some(parse_resolution(value()?)?),
                "--samples" => {
                    options.samples = Some(value()?.parse().context("--samples expects a number")?)
                }
                "--path-length" => {
                    options.path_length = Some(value()?.parse().context("--path-length expects a number")?)
                }
                "--obj" => options.obj = true,
                "--save-settings" => options.save_settings = true,
                other => bail!("unknown export option '{}'", other),
            }
        }
        Ok(options)
    }

    fn apply(&self, settings: &mut ExportSettings) {
        if let Some(integrator) = &self.integrator {
            settings.integrator = integrator.clone();
        }
        if let Some((w, h)) = self.resolution {
            settings.xres = w;
            settings.yres = h;
        }
        if let Some(samples) = self.samples {
            settings.samples_per_pixel = samples;
        }
        if let Some(depth) = self.path_length {
            settings.path_length = depth;
        }
        if self.obj {
            settings.write_serialized = false;
        }
    }
}

fn cmd_export(input: &Path, options: ExportOptions) -> Result<()> {
    let mut settings = match &options.settings {
        Some(path) => ExportSettings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => ExportSettings::load(),
    };
    options.apply(&mut settings);
    // Fail early on a bad integrator, before anything is read or written.
    settings.integrator()?;

    if options.save_settings {
        settings.save().context("failed to save settings")?;
    }

    let scene = MemoryScene::load(input).with_context(|| format!("failed to load {}", input.display()))?;

    let output = match &options.output {
        Some(dir) => dir.clone(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    let name = options.name.clone().unwrap_or_else(|| {
        let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned());
        format!("{}.xml", stem.unwrap_or_else(|| "scene".to_string()))
    });

    let report = Exporter::new(settings, &output, name).export(&scene)?;

    println!("Scene:      {}", report.scene_path.display());
    println!("Geometry:   {}", report.geometry_path.display());
    println!("Materials:  {}", report.materials);
    println!("Groups:     {}", report.groups);
    println!("Instances:  {}", report.instances);
    println!("Shapes:     {} ({} meshes)", report.shapes, report.meshes);
    println!("Sensor:     {}", if report.sensor { "yes" } else { "no" });
    if report.skipped_objects > 0 {
        println!("Skipped:    {} objects without render meshes", report.skipped_objects);
    }
    for warning in &report.warnings {
        println!("Warning:    {}", warning);
    }
    println!("Time:       {} ms", report.elapsed.as_millis());
    Ok(())
}

fn cmd_inspect(path: &Path) -> Result<()> {
    let reader = ArchiveReader::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    println!("Archive: {}", path.display());
    println!("Size:    {} bytes", reader.size());
    println!("Meshes:  {}", reader.mesh_count());
    println!();

    let mut total_verts = 0u64;
    let mut total_tris = 0u64;
    let mut scene_bounds = BBox3f::EMPTY;
    for index in 0..reader.mesh_count() {
        let info = reader.mesh_info(index)?;
        let name = if info.name.is_empty() { "<unnamed>" } else { info.name.as_str() };
        println!(
            "  [{:>4}] @{:<10} {:>8} verts {:>8} tris  {:?}  {}",
            index, info.offset, info.vertex_count, info.triangle_count, info.flags, name
        );
        let bounds = reader.read_mesh(index)?.bounds();
        if !bounds.is_empty() {
            println!("         bounds {} .. {}", fmt_vec3(bounds.min), fmt_vec3(bounds.max));
            scene_bounds.expand_by_point(bounds.min);
            scene_bounds.expand_by_point(bounds.max);
        }
        total_verts += info.vertex_count;
        total_tris += info.triangle_count;
    }

    println!();
    println!("Total: {} vertices, {} triangles", total_verts, total_tris);
    if !scene_bounds.is_empty() {
        println!("Bounds: {} .. {}", fmt_vec3(scene_bounds.min), fmt_vec3(scene_bounds.max));
    }
    Ok(())
}

fn fmt_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}
