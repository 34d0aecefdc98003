use EEDFKernels::Examples::eedf_examples::eedf_examples;
use log::error;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn main() {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
    //
    let task: usize = 2;
    if let Err(e) = eedf_examples(task) {
        error!("example {} failed: {}", task, e);
    }
}
