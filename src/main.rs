use std::path::Path;
use std::time::Instant;
use teljari::{Aggregation, CounterFactory, CounterName, DiskStorage, Duration};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> teljari::Result<()> {
    env_logger::builder()
        .filter_module("lsm_tree", log::LevelFilter::Warn)
        .filter_module("fjall", log::LevelFilter::Info)
        .filter_module("teljari", log::LevelFilter::Trace)
        .parse_default_env()
        .init();

    let path = Path::new(".testy");

    if path.try_exists()? {
        std::fs::remove_dir_all(path)?;
    }

    let factory = CounterFactory::new(DiskStorage::open(path)?);
    let counter = factory.counter(CounterName::try_from("api.requests").unwrap());

    let now = teljari::timestamp();
    let window = Duration::hours(1);

    let start = Instant::now();

    {
        use rand::Rng;

        let mut rng = rand::thread_rng();

        for idx in 0..1_000_000u64 {
            // spread the writes over the past hour
            let ts = now - rng.gen_range(0..window);
            counter.add_at(ts, rng.gen_range(1..10))?;

            if idx % 100_000 == 0 {
                log::info!("ingested {idx}");
            }
        }
    }

    log::info!("ingested in {:?}", start.elapsed());

    for kind in [
        Aggregation::Sum,
        Aggregation::Minimum,
        Aggregation::Maximum,
        Aggregation::Average,
    ] {
        let start = Instant::now();

        // one point per minute
        let series = counter.last_n(60, 60, kind)?;

        log::info!("queried in {:?}", start.elapsed());

        let values = series.iter().map(teljari::DataPoint::value).collect::<Vec<_>>();
        log::info!("{kind:?} over the last hour: {values:?}");
    }

    Ok(())
}
