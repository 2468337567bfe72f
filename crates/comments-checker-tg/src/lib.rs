mod checker;
mod config;
mod db;
mod error;
mod observability;
mod tg;

mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

use std::time::Duration;

/// Delay before restarting the bot after a transient connectivity failure
const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Run the telegram bot processing loop.
///
/// The bot is restarted when it fails with a transient network error. The
/// database pool is closed on every exit path.
pub async fn run(config: Config) -> Result<()> {
    use crate::prelude::*;

    let db = db::init(config.db).await?;

    let result = async {
        loop {
            let opts = tg::RunBotOptions {
                tg_cfg: config.tg.clone(),
                checker_cfg: config.checker.clone(),
                db: db.clone(),
            };

            let err = match tg::run_bot(opts).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            warn!(
                err = tracing_err(&err),
                delay = tracing_duration(RESTART_DELAY),
                "Bot failed with a transient error, restarting..."
            );

            tokio::time::sleep(RESTART_DELAY).await;
        }
    }
    .await;

    db.close().await;

    result
}
