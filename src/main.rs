use clap::Parser;
use env_logger::Env;

use leads_dashboard_lib::cli::Args;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match leads_dashboard_lib::run(args) {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
