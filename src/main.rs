use clap::Parser;
use drs_processor::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("DRS Processor - CMOR climate model output toolkit");
    println!("=================================================");
    println!();
    println!("Locate model output laid out by a Data Reference Syntax, read the");
    println!("years covered by each file and merge new output into existing files.");
    println!();
    println!("USAGE:");
    println!("    drs-processor <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    find        Locate the input files of a dataset");
    println!("    years       Print the start and end year of files");
    println!("    concat      Merge files into a target file (needs the netcdf feature)");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Find monthly CMIP5 tas files between 1990 and 2000:");
    println!("    drs-processor find --tag project=CMIP5 --tag dataset=EC-EARTH \\");
    println!("                       --tag exp=historical --tag ensemble=r1i1p1 \\");
    println!("                       --tag mip=Amon --tag short_name=tas --tag frequency=mon \\");
    println!("                       --start-year 1990 --end-year 2000");
    println!();
    println!("    # Read the years encoded in file names:");
    println!("    drs-processor years tas_Amon_EC-EARTH_historical_r1i1p1_185001-200512.nc");
    println!();
    println!("    # Merge a new file into an existing one:");
    println!("    drs-processor concat new.nc --target existing.nc");
    println!();
    println!("For detailed help on any command, use:");
    println!("    drs-processor <COMMAND> --help");
}
