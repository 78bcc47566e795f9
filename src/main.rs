use camino::Utf8PathBuf;
use clap::Parser;
use eyre::{Result, WrapErr};
use fusegen::{run, Config, Count, Hierarchy, Selection};

/// Generate a testbench include from Fuse Z80 test vectors.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the vector files
    #[arg(long, default_value = "fuse")]
    dir: Utf8PathBuf,

    /// Run the regression vectors (regress.in / regress.expected), all of them
    #[arg(long)]
    regress: bool,

    /// Name of the first test to run (default: first in the file)
    #[arg(short, long, conflicts_with = "regress")]
    start: Option<String>,

    /// Number of tests to run, -1 for all
    #[arg(
        short = 'n',
        long,
        default_value_t = -1,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-1..),
        conflicts_with = "regress"
    )]
    count: i64,

    /// Generated include file
    #[arg(short, long, default_value = "test_fuse.i")]
    output: Utf8PathBuf,

    /// Testbench source that includes the output; touched so it rebuilds
    #[arg(long, default_value = "test_fuse.sv")]
    touch: Utf8PathBuf,

    /// Do not touch the including testbench source
    #[arg(long, conflicts_with = "touch")]
    no_touch: bool,

    /// Instance name of the CPU core in the testbench
    #[arg(long, default_value = "dut")]
    dut: String,

    /// Memory array of the RAM model
    #[arg(long, default_value = "ram.Mem")]
    ram: String,

    /// File handle the diagnostics are written to
    #[arg(long, default_value = "f")]
    log_handle: String,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let (input, expected) = Config::vector_paths(&self.dir, self.regress);
        let selection = if self.regress {
            Selection::all()
        } else {
            let count = Count::from_raw(self.count)
                .ok_or_else(|| eyre::eyre!("invalid test count {}", self.count))?;
            Selection::new(self.start, count)
        };
        Ok(Config {
            input,
            expected,
            output: self.output,
            touch: (!self.no_touch).then_some(self.touch),
            selection,
            hierarchy: Hierarchy {
                dut: self.dut,
                ram: self.ram,
                log_handle: self.log_handle,
            },
        })
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    let generated = run(&config).wrap_err_with(|| {
        format!(
            "could not generate `{}` from `{}`",
            config.output, config.input
        )
    })?;

    println!(
        "✅ {} tests, TOTAL_CLKS = {}, written to {}",
        generated.tests, generated.total_clks, config.output
    );
    Ok(())
}
