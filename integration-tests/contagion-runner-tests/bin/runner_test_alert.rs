//! Stops an automatic run as soon as the outbreak reaches a number of active cases.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use ixa_contagion::prelude::*;
use ixa_contagion::runner::run_with_custom_args;

#[derive(Args, Debug)]
struct Alert {
    /// Stop once this many vertices are infected or quarantined
    #[arg(short, long)]
    alert_at: usize,
}

struct AlertSink {
    threshold: usize,
    stop: Arc<AtomicBool>,
}

impl StepSink for AlertSink {
    fn record(
        &mut self,
        report: &StepReport,
        _: &SimulationState,
    ) -> Result<(), ContagionError> {
        if report.total_cases >= self.threshold && !self.stop.swap(true, Ordering::Relaxed) {
            println!("alert: {} active cases on day {}", report.total_cases, report.day);
        }
        Ok(())
    }
}

fn main() {
    run_with_custom_args(|session, _args, alert: Option<Alert>| {
        if let Some(alert) = alert {
            let stop = session.runner().stop_handle();
            session.add_sink(Box::new(AlertSink {
                threshold: alert.alert_at,
                stop,
            }));
        }
        Ok(())
    })
    .unwrap();
}
