use clap::{Arg, ArgAction, Command as ClapCommand};
use log::{error, LevelFilter};
use std::path::Path;
use std::process;

use sentinelkit::commands::{CommandFactory, SentinelkitCommandFactory};
use sentinelkit::utils::logger::Logger;
use sentinelkit::Settings;

fn product_arg() -> Arg {
    Arg::new("product")
        .help("Sentinel-2 product archive (.zip)")
        .required(true)
        .index(1)
}

fn output_arg(required: bool) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .help("Output path")
        .value_name("PATH")
        .required(required)
}

fn resampling_arg() -> Arg {
    Arg::new("resampling")
        .long("resampling")
        .help("Resampling kernel (nearest, bilinear, cubic, average, mode)")
        .value_name("KERNEL")
}

fn grid_size_arg() -> Arg {
    Arg::new("grid-size")
        .long("grid-size")
        .help("Number of rows and columns of the tile grid")
        .value_name("N")
}

fn cli() -> ClapCommand {
    ClapCommand::new("sentinelkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read, mask, stack and export Sentinel-2 product archives")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML settings file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write log records to this file")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            ClapCommand::new("info")
                .about("List the bands of a product, or the structure of a GeoTIFF")
                .arg(Arg::new("input").help("Product archive or GeoTIFF").required(true).index(1)),
        )
        .subcommand(
            ClapCommand::new("mask")
                .about("Build the SCL validity mask")
                .arg(product_arg())
                .arg(output_arg(true))
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .help("Target resolution in metres (10, 20 or 60)")
                        .value_name("RES"),
                )
                .arg(
                    Arg::new("invalid-codes")
                        .long("invalid-codes")
                        .help("Comma-separated SCL codes treated as invalid")
                        .value_name("CODES"),
                )
                .arg(resampling_arg()),
        )
        .subcommand(
            ClapCommand::new("stack")
                .about("Stack bands onto one grid")
                .arg(product_arg())
                .arg(output_arg(true))
                .arg(
                    Arg::new("bands")
                        .short('b')
                        .long("bands")
                        .help("Comma-separated band list, e.g. B02,B03,B04,B8A")
                        .value_name("BANDS")
                        .required(true),
                )
                .arg(
                    Arg::new("align-to")
                        .long("align-to")
                        .help("Output resolution: min, max, 10, 20 or 60")
                        .value_name("TARGET"),
                )
                .arg(resampling_arg())
                .arg(
                    Arg::new("band-res")
                        .long("band-res")
                        .help("Native resolution to read a band at, e.g. B01=60")
                        .value_name("BAND=RES")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("force-single")
                        .long("force-single")
                        .help("Regrid a single band to the alignment target")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("export")
                .about("Export to WGS84 through Web Mercator")
                .arg(product_arg())
                .arg(output_arg(false))
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .help("single, rgb, rgba or grid")
                        .value_name("MODE")
                        .default_value("rgb"),
                )
                .arg(Arg::new("band").long("band").help("Band for single exports").value_name("BAND"))
                .arg(
                    Arg::new("resolution")
                        .short('r')
                        .long("resolution")
                        .help("Native resolution to read bands at")
                        .value_name("RES"),
                )
                .arg(grid_size_arg())
                .arg(
                    Arg::new("progress")
                        .long("progress")
                        .help("Show a progress bar for grid exports")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            ClapCommand::new("scenes")
                .about("List product archives and SAFE folders")
                .arg(Arg::new("dir").help("Folder to scan (defaults to paths.scenes_dir)").index(1)),
        )
        .subcommand(
            ClapCommand::new("quicklook")
                .about("Render a stretched PNG from an exported GeoTIFF")
                .arg(Arg::new("input").help("Three or four band GeoTIFF").required(true).index(1))
                .arg(output_arg(true))
                .arg(
                    Arg::new("slice-dir")
                        .long("slice-dir")
                        .help("Also cut the PNG into a tile grid in this folder")
                        .value_name("DIR"),
                )
                .arg(grid_size_arg()),
        )
        .subcommand(
            ClapCommand::new("bounds")
                .about("Print WGS84 bounds of a GeoTIFF")
                .arg(Arg::new("input").help("GeoTIFF").required(true).index(1))
                .arg(Arg::new("dx").long("dx").help("Eastward shift in metres").value_name("M").allow_hyphen_values(true))
                .arg(Arg::new("dy").long("dy").help("Northward shift in metres").value_name("M").allow_hyphen_values(true)),
        )
}

fn init_logging(log_file: Option<&String>, verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    match log_file {
        Some(path) => {
            if let Err(e) = Logger::init_global_logger(Path::new(path), level) {
                eprintln!("Error setting up logger: {}", e);
                process::exit(1);
            }
        }
        None => {
            env_logger::Builder::from_default_env().filter_level(level).init();
        }
    }
}

fn main() {
    let matches = cli().get_matches();
    // Global args propagate down only
    let scoped = matches.subcommand().map(|(_, sub)| sub).unwrap_or(&matches);

    init_logging(scoped.get_one::<String>("log-file"), scoped.get_flag("verbose"));

    let settings = match Settings::load(scoped.get_one::<String>("config").map(Path::new)) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to load settings: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let factory = SentinelkitCommandFactory::new();

    match factory.create_command(&matches, &settings) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
}
