mod cli;
mod util;

#[macro_use]
extern crate anyhow;

pub fn main() -> ! {
    env_logger::builder().parse_env("BUCK_LOG").init();
    if let Err(err) = cli::run(std::env::args_os()) {
        eprintln!("{}", err);
        std::process::exit(1)
    } else {
        std::process::exit(0)
    }
}
