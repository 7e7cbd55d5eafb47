//! Purges settled mess plans that ended more than CLEANUP_MONTHS ago.
//! Meant to run from cron; pending plans are never touched.

use chrono::{Local, Months};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use mess_server::{config::Config, db::init_db, models::mess_plan};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let months: u32 = std::env::var("CLEANUP_MONTHS")
        .unwrap_or_else(|_| "1".to_string())
        .parse()
        .expect("CLEANUP_MONTHS must be a number");

    let config = Config::load();
    let pool = init_db(&config.database_url)
        .await
        .expect("Database misconfigured!");

    let cutoff = Local::now()
        .date_naive()
        .checked_sub_months(Months::new(months))
        .expect("Cutoff date out of range");

    info!("Deleting approved/rejected mess plans that ended before {cutoff}");

    let deleted = mess_plan::delete_ended_before(&pool, cutoff)
        .await
        .expect("Cleanup query failed");

    info!("Deleted {deleted} old mess plan(s)");
}
