use std::time::Instant;

pub fn run_blocking<F, T>(label: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let started = Instant::now();
    let result = f();
    log::debug!("{label} took {:?}", started.elapsed());
    result
}
