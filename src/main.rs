use std::rc::Rc;

use log::info;

use config::DemoConfig;
use ids::IdSource;
use payload::RandomPayload;
use report::StdoutSink;
use task_unit::Bench;

mod config;
mod error;
mod ids;
mod logging;
mod mini_rt;
mod payload;
mod report;
mod strategy;
mod task_unit;

fn main() {
    let config = match DemoConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = logging::init(config.log_level) {
        eprintln!("logging disabled: {err}");
    }

    let bench = Rc::new(Bench::new(
        IdSource::new(config.id_bound),
        Box::new(RandomPayload::new(config.payload_len, config.payload_max)),
        Rc::new(StdoutSink),
        config.tick,
    ));

    for timing in strategy::run_all(&bench, config.durations) {
        let status = match &timing.outcome {
            Ok(reports) => format!("{} report(s)", reports.len()),
            Err(err) => format!("failed: {err}"),
        };
        info!(
            "{}: {:.3}s, {status}",
            timing.strategy.name(),
            timing.elapsed.as_secs_f64()
        );
    }
    info!("{} identifier(s) issued", bench.issued());
}
