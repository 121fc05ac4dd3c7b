mod entry;
mod logger;
mod shutdown;
mod shutdown_handlers;

use metric_rollup::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
