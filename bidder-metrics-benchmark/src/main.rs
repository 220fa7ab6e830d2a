use bidder_metrics::{default_quantiles, names, BidderMetrics, MetricsConfig, Snapshot};
use getopts::{Matches, Options};
use hdrhistogram::Histogram as HdrHistogram;
use log::{error, info};
use quanta::Clock;
use std::{
    env,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

const LOOP_SAMPLE: u64 = 1000;

// Each loop iteration performs this many metric operations.
const OPS_PER_LOOP: u64 = 6;

struct Generator {
    metrics: Arc<BidderMetrics>,
    accounts: Arc<Vec<String>>,
    adapters: Arc<Vec<String>>,
    offset: usize,
    hist: HdrHistogram<u64>,
    done: Arc<AtomicBool>,
    rate_counter: Arc<AtomicU64>,
}

impl Generator {
    fn new(
        metrics: Arc<BidderMetrics>,
        accounts: Arc<Vec<String>>,
        adapters: Arc<Vec<String>>,
        offset: usize,
        done: Arc<AtomicBool>,
        rate_counter: Arc<AtomicU64>,
    ) -> Result<Generator, hdrhistogram::CreationError> {
        Ok(Generator {
            metrics,
            accounts,
            adapters,
            offset,
            hist: HdrHistogram::<u64>::new_with_bounds(1, u64::MAX, 3)?,
            done,
            rate_counter,
        })
    }

    fn run(&mut self) {
        let clock = Clock::new();
        let mut loop_counter: u64 = 0;

        loop {
            loop_counter += 1;

            let i = self.offset.wrapping_add(loop_counter as usize);
            let account_id = &self.accounts[i % self.accounts.len()];
            let adapter_code = &self.adapters[i % self.adapters.len()];

            let start = if loop_counter % LOOP_SAMPLE == 0 { Some(clock.now()) } else { None };
            let request_start = Instant::now();

            self.metrics.inc_request(1);

            let account = self.metrics.account_metrics(account_id);
            account.inc_request(1);

            let adapter = account.adapter_metrics(adapter_code);
            adapter.inc_request(1);
            adapter.inc_bids_received(1);
            adapter.update_price_histogram((loop_counter % 5_000) as i64);

            self.metrics.update_request_timer_since(request_start);

            if let Some(val) = start {
                let delta = clock.now() - val;
                self.hist.saturating_record(delta.as_nanos() as u64);

                // We also increment our global counter for the sample rate here.
                self.rate_counter.fetch_add(LOOP_SAMPLE * OPS_PER_LOOP, Ordering::AcqRel);

                if self.done.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        info!(
            "    sender latency: min: {:8} p50: {:8} p95: {:8} p99: {:8} p999: {:8} max: {:8}",
            nanos_to_readable(self.hist.min()),
            nanos_to_readable(self.hist.value_at_percentile(50.0)),
            nanos_to_readable(self.hist.value_at_percentile(95.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.0)),
            nanos_to_readable(self.hist.value_at_percentile(99.9)),
            nanos_to_readable(self.hist.max())
        );
    }
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

pub fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("d", "duration", "number of seconds to run the benchmark", "INTEGER");
    opts.optopt("p", "producers", "number of producers", "INTEGER");
    opts.optopt("a", "accounts", "number of distinct account identifiers", "INTEGER");
    opts.optopt("b", "adapters", "number of configured adapters", "INTEGER");
    opts.optflag("h", "help", "print this help menu");

    opts
}

fn parse_opt<T: FromStr>(matches: &Matches, name: &str, default: T) -> Result<T, String> {
    match matches.opt_str(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| format!("invalid value for --{}: {}", name, raw)),
    }
}

fn main() {
    pretty_env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return;
        }
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    info!("bidder metrics benchmark");

    let settings = (|| {
        let seconds: u64 = parse_opt(&matches, "duration", 60)?;
        let producers: usize = parse_opt(&matches, "producers", 1)?;
        let accounts: usize = parse_opt(&matches, "accounts", 1000)?;
        let adapters: usize = parse_opt(&matches, "adapters", 8)?;
        Ok::<_, String>((seconds, producers, accounts.max(1), adapters.max(1)))
    })();
    let (seconds, producers, account_count, adapter_count) = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("duration: {}s", seconds);
    info!("producers: {}", producers);
    info!("accounts: {}", account_count);
    info!("adapters: {}", adapter_count);

    let adapters = (0..adapter_count).map(|i| format!("adapter{}", i)).collect::<Vec<_>>();
    let accounts = (0..account_count).map(|i| format!("pub{}", i)).collect::<Vec<_>>();

    let metrics = match BidderMetrics::new(&adapters, &MetricsConfig::default()) {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            error!("Failed to build metrics: {}", e);
            return;
        }
    };

    info!("metrics configured");

    // Spin up our sample producers.
    let accounts = Arc::new(accounts);
    let adapters = Arc::new(adapters);
    let done = Arc::new(AtomicBool::new(false));
    let rate_counter = Arc::new(AtomicU64::new(0));
    let mut handles = Vec::new();

    for offset in 0..producers {
        let generator = Generator::new(
            metrics.clone(),
            accounts.clone(),
            adapters.clone(),
            offset * 7919,
            done.clone(),
            rate_counter.clone(),
        );
        let mut generator = match generator {
            Ok(generator) => generator,
            Err(e) => {
                error!("Failed to create latency histogram: {}", e);
                return;
            }
        };

        handles.push(thread::spawn(move || generator.run()));
    }

    // Poll the rate counter, and snapshot the metrics as an exporter would.
    let mut total = 0;
    let mut t0 = Instant::now();

    let mut snapshot_hist = match HdrHistogram::<u64>::new_with_bounds(1, u64::MAX, 3) {
        Ok(hist) => hist,
        Err(e) => {
            error!("Failed to create snapshot histogram: {}", e);
            return;
        }
    };
    for _ in 0..seconds {
        let t1 = Instant::now();

        let start = Instant::now();
        let snapshot = metrics.snapshot();
        let end = Instant::now();
        snapshot_hist.saturating_record((end - start).as_nanos() as u64);

        let turn_total = rate_counter.load(Ordering::Acquire);
        let turn_delta = turn_total - total;
        total = turn_total;
        let rate = turn_delta as f64 / (t1 - t0).as_secs_f64();

        info!(
            "sample ingest rate: {:.0} samples/sec ({} accounts, {} metrics)",
            rate,
            metrics.account_count(),
            snapshot.len()
        );
        t0 = t1;
        thread::sleep(Duration::new(1, 0));
    }

    info!("--------------------------------------------------------------------------------");
    info!(" ingested samples total: {}", total);
    info!(
        "          snapshot: min: {:8} p50: {:8} p95: {:8} p99: {:8} p999: {:8} max: {:8}",
        nanos_to_readable(snapshot_hist.min()),
        nanos_to_readable(snapshot_hist.value_at_percentile(50.0)),
        nanos_to_readable(snapshot_hist.value_at_percentile(95.0)),
        nanos_to_readable(snapshot_hist.value_at_percentile(99.0)),
        nanos_to_readable(snapshot_hist.value_at_percentile(99.9)),
        nanos_to_readable(snapshot_hist.max())
    );

    log_request_time(&metrics.snapshot());

    // Wait for the producers to finish so we can get their stats too.
    done.store(true, Ordering::SeqCst);
    for handle in handles {
        if handle.join().is_err() {
            error!("producer thread panicked");
        }
    }
}

fn log_request_time(snapshot: &Snapshot) {
    let Some(value) = snapshot.get(names::REQUEST_TIME) else {
        return;
    };

    if let Some(dist) = value.as_distribution() {
        let quantiles = default_quantiles();
        let summary = dist
            .quantiles(&quantiles)
            .into_iter()
            .map(|(q, v)| format!("{}: {:8}", q, nanos_to_readable(v as u64)))
            .collect::<Vec<_>>()
            .join(" ");
        info!("      request time: {}", summary);
    }

    if let Some(rates) = value.as_rates() {
        info!(
            "      request rate: mean: {:.0}/s m1: {:.0}/s m5: {:.0}/s m15: {:.0}/s",
            rates.mean, rates.m1, rates.m5, rates.m15
        );
    }
}

fn nanos_to_readable(t: u64) -> String {
    let f = t as f64;
    if f < 1_000.0 {
        format!("{}ns", f)
    } else if f < 1_000_000.0 {
        format!("{:.0}μs", f / 1_000.0)
    } else if f < 2_000_000_000.0 {
        format!("{:.2}ms", f / 1_000_000.0)
    } else {
        format!("{:.3}s", f / 1_000_000_000.0)
    }
}
